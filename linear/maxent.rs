use super::{
	conditional_probability, evaluate, CompiledFeature, CompiledInstance, EpochReport, Error,
	Evaluation, FeatureTable, Instance, Prediction, Progress, TrainOptions, Vocabulary,
};
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
	io::{Read, Write},
	path::Path,
};

/// A trained maximum entropy classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaxEnt {
	/// the class labels, in the order of their label ids
	pub classes: Vocabulary,
	/// the names of the features seen in the training instances
	pub feature_names: Vocabulary,
	pub table: FeatureTable,
	/// the diagnostics from each epoch of training
	pub reports: Vec<EpochReport>,
}

impl MaxEnt {
	/**
	Train a model on `instances`. The last `options.num_heldout` instances are held out from training and evaluated after each epoch.

	The options are validated before anything else is done, so a configuration error never leaves a partially trained model behind.
	*/
	pub fn train(
		instances: &[Instance],
		options: &TrainOptions,
		update_progress: &mut dyn FnMut(Progress),
	) -> Result<MaxEnt, Error> {
		let mut optimizer = options.optimizer.build();
		optimizer.validate(&options.regularization)?;
		if options.num_heldout >= instances.len() {
			return Err(Error::EmptyTrainingSet);
		}
		let (train, heldout) = instances.split_at(instances.len() - options.num_heldout);

		// The number of classes must be known before the first feature is created.
		let mut classes = Vocabulary::new();
		let labels: Vec<usize> = train
			.iter()
			.map(|instance| classes.get_or_insert(&instance.label))
			.collect();

		let mut feature_names = Vocabulary::new();
		let mut table = FeatureTable::new(classes.len());
		let mut compiled_train = Vec::with_capacity(train.len());
		for (instance, label) in train.iter().zip(labels) {
			let features: Vec<(usize, f64)> = instance
				.features
				.iter()
				.map(|(name, value)| (feature_names.get_or_insert(name), *value))
				.collect();
			compiled_train.push(CompiledInstance::compile(label, &features, &mut table));
		}
		let compiled_heldout = compile_frozen(heldout, &classes, &feature_names, &table);

		log::debug!(
			"compiled {} training instances and {} heldout instances with {} classes and {} features",
			compiled_train.len(),
			compiled_heldout.len(),
			classes.len(),
			table.n_features(),
		);
		update_progress(Progress::Compiled {
			n_instances: compiled_train.len(),
			n_heldout: compiled_heldout.len(),
			n_classes: classes.len(),
			n_features: table.n_features(),
		});

		let reports = optimizer.optimize(
			&compiled_train,
			&compiled_heldout,
			&mut table,
			&options.regularization,
			update_progress,
		)?;
		Ok(MaxEnt {
			classes,
			feature_names,
			table,
			reports,
		})
	}

	/// Compute the conditional probability distribution over the classes for `instance`. Features that were not seen in training are ignored.
	pub fn predict(&self, instance: &Instance) -> Prediction {
		let features: Vec<CompiledFeature> = instance
			.features
			.iter()
			.filter_map(|(name, value)| {
				let name = self.feature_names.get(name)?;
				let ids = self.table.resolve(name)?;
				Some(CompiledFeature {
					name,
					first_id: ids.start,
					value: *value,
				})
			})
			.collect();
		let mut probabilities = Array1::zeros(self.classes.len());
		let label = conditional_probability(
			self.table.lambdas(),
			&features,
			probabilities.view_mut(),
		);
		Prediction {
			probabilities,
			label,
		}
	}

	/// Evaluate the model on labeled `instances`. Instances with a label the model was not trained on are skipped.
	pub fn evaluate(&self, instances: &[Instance]) -> Option<Evaluation> {
		let instances = compile_frozen(instances, &self.classes, &self.feature_names, &self.table);
		evaluate(&self.table, &instances)
	}

	pub fn class_name(&self, label: usize) -> &str {
		self.classes.name(label)
	}

	/// Deserialize a `MaxEnt` from a slice.
	pub fn from_slice(slice: &[u8]) -> Result<Self, Error> {
		let (major_version, slice) = slice.split_first().ok_or(Error::EmptyModelFile)?;
		if *major_version != 0 {
			return Err(Error::UnknownFormatVersion(*major_version));
		}
		let model: Self = rmp_serde::from_slice(slice)?;
		Ok(model)
	}

	/// Deserialize a `MaxEnt` by reading the file at `path`.
	pub fn from_path(path: &Path) -> Result<Self, Error> {
		let file = std::fs::File::open(path)?;
		let mut reader = std::io::BufReader::new(file);
		let mut major_version = [0u8; 1];
		reader.read_exact(&mut major_version)?;
		let major_version = major_version[0];
		if major_version != 0 {
			return Err(Error::UnknownFormatVersion(major_version));
		}
		let model: Self = rmp_serde::from_read(&mut reader)?;
		Ok(model)
	}

	/// Write this model to `writer`, prefixed by the format version.
	pub fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
		writer.write_all(&[0])?;
		rmp_serde::encode::write_named(&mut writer, self)?;
		Ok(())
	}

	/// Write this model to the file at `path`.
	pub fn to_file(&self, path: &Path) -> Result<(), Error> {
		let file = std::fs::File::create(path)?;
		let mut writer = std::io::BufWriter::new(file);
		self.to_writer(&mut writer)?;
		writer.flush()?;
		Ok(())
	}
}

/// Compile instances against a table that must not grow, skipping any instance whose label is not in `classes`.
fn compile_frozen(
	instances: &[Instance],
	classes: &Vocabulary,
	feature_names: &Vocabulary,
	table: &FeatureTable,
) -> Vec<CompiledInstance> {
	instances
		.iter()
		.filter_map(|instance| {
			let label = match classes.get(&instance.label) {
				Some(label) => label,
				None => {
					log::warn!(
						"skipping an instance with the label \"{}\", which does not occur in the training instances",
						instance.label
					);
					return None;
				}
			};
			let features: Vec<(usize, f64)> = instance
				.features
				.iter()
				.filter_map(|(name, value)| Some((feature_names.get(name)?, *value)))
				.collect();
			Some(CompiledInstance::compile_frozen(label, &features, table))
		})
		.collect()
}

#[cfg(test)]
fn weather() -> Vec<Instance> {
	[
		"outdoor sunny warm",
		"outdoor sunny windy:0.5",
		"indoor rainy cold",
		"indoor rainy windy",
		"outdoor sunny cold",
		"indoor cloudy cold windy",
		"outdoor cloudy warm",
		"indoor rainy warm",
	]
	.iter()
	.map(|line| line.parse().unwrap())
	.collect()
}

#[cfg(test)]
fn train_options(max_epochs: usize, num_heldout: usize) -> TrainOptions {
	TrainOptions {
		num_heldout,
		optimizer: super::OptimizerOptions::Sgd(super::SgdOptions {
			max_epochs,
			..Default::default()
		}),
		..Default::default()
	}
}

#[test]
fn test_train() {
	let instances = weather();
	let mut n_epochs = 0;
	let model = MaxEnt::train(&instances, &train_options(30, 0), &mut |progress| {
		if let Progress::Epoch(_) = progress {
			n_epochs += 1
		}
	})
	.unwrap();
	assert_eq!(n_epochs, 30);
	assert_eq!(model.reports.len(), 30);
	assert_eq!(model.classes.names(), ["outdoor", "indoor"]);
	assert_eq!(model.feature_names.len(), 6);
	assert_eq!(model.table.n_features(), 12);
	for instance in instances.iter() {
		let prediction = model.predict(instance);
		assert_eq!(model.class_name(prediction.label), instance.label);
	}
	let last = model.reports.last().unwrap();
	assert_eq!(last.accuracy, 1.0);
	assert!(last.objective < model.reports[0].objective);
	// Unknown features are ignored.
	let prediction = model.predict(&"? sunny snowy".parse().unwrap());
	assert_eq!(model.class_name(prediction.label), "outdoor");
}

#[test]
fn test_heldout() {
	let mut instances = weather();
	instances.push("outdoor sunny hail".parse().unwrap());
	instances.push("unseen sunny".parse().unwrap());
	let mut compiled = None;
	let model = MaxEnt::train(&instances, &train_options(5, 2), &mut |progress| {
		if let Progress::Compiled { .. } = progress {
			compiled = Some(progress)
		}
	})
	.unwrap();
	// The instance with an unseen label is skipped, and the unseen feature creates no weights.
	assert_eq!(
		compiled,
		Some(Progress::Compiled {
			n_instances: 8,
			n_heldout: 1,
			n_classes: 2,
			n_features: 12,
		})
	);
	assert!(model.feature_names.get("hail").is_none());
	assert!(model.reports.iter().all(|report| report.heldout.is_some()));
	let evaluation = model.evaluate(&instances[8..]).unwrap();
	assert_eq!(evaluation.accuracy, 1.0);
}

#[test]
fn test_configuration_errors() {
	let instances = weather();
	let mut options = train_options(5, 0);
	options.regularization.l2 = 1.0;
	let mut n_updates = 0;
	let result = MaxEnt::train(&instances, &options, &mut |_| n_updates += 1);
	assert!(matches!(result, Err(Error::L2RegularizationUnsupported(_))));
	assert_eq!(n_updates, 0);
	let result = MaxEnt::train(&instances, &train_options(5, 8), &mut |_| {});
	assert!(matches!(result, Err(Error::EmptyTrainingSet)));
	let result = MaxEnt::train(&[], &train_options(5, 0), &mut |_| {});
	assert!(matches!(result, Err(Error::EmptyTrainingSet)));
}

#[test]
fn test_round_trip() {
	let instances = weather();
	let mut options = train_options(10, 0);
	options.regularization.l1 = 0.01;
	let model = MaxEnt::train(&instances, &options, &mut |_| {}).unwrap();
	let mut bytes = Vec::new();
	model.to_writer(&mut bytes).unwrap();
	assert_eq!(bytes[0], 0);
	let reloaded = MaxEnt::from_slice(&bytes).unwrap();
	assert_eq!(reloaded, model);
	for instance in instances.iter() {
		assert_eq!(reloaded.predict(instance), model.predict(instance));
	}
	bytes[0] = 1;
	assert!(matches!(
		MaxEnt::from_slice(&bytes),
		Err(Error::UnknownFormatVersion(1))
	));
	assert!(matches!(MaxEnt::from_slice(&[]), Err(Error::EmptyModelFile)));
}

#[test]
fn test_round_trip_file() {
	let instances = weather();
	let model = MaxEnt::train(&instances, &train_options(3, 0), &mut |_| {}).unwrap();
	let path = std::env::temp_dir().join(format!("maxent_round_trip_{}.model", std::process::id()));
	model.to_file(&path).unwrap();
	let reloaded = MaxEnt::from_path(&path).unwrap();
	std::fs::remove_file(&path).unwrap();
	assert_eq!(reloaded, model);
}
