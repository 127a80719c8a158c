use super::FeatureTable;

/// A feature value whose weight ids have already been looked up in the [`FeatureTable`](struct.FeatureTable.html). The weights for this feature name are `first_id..first_id + n_classes`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompiledFeature {
	pub name: usize,
	pub first_id: usize,
	pub value: f64,
}

/**
A `CompiledInstance` is a training example resolved against a [`FeatureTable`](struct.FeatureTable.html), so the training loop never looks up a name. It is immutable once built.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledInstance {
	label: usize,
	n_classes: usize,
	features: Vec<CompiledFeature>,
}

impl CompiledInstance {
	/// Compile an instance for training. Feature names `table` has not seen yet are added to it.
	pub fn compile(label: usize, features: &[(usize, f64)], table: &mut FeatureTable) -> Self {
		let features = features
			.iter()
			.map(|&(name, value)| CompiledFeature {
				name,
				first_id: table.resolve_or_create(name).start,
				value,
			})
			.collect();
		Self {
			label,
			n_classes: table.n_classes(),
			features,
		}
	}

	/// Compile an instance against a table that must not grow. Feature names `table` has never seen have no weights and are dropped.
	pub fn compile_frozen(label: usize, features: &[(usize, f64)], table: &FeatureTable) -> Self {
		let features = features
			.iter()
			.filter_map(|&(name, value)| {
				let ids = table.resolve(name)?;
				Some(CompiledFeature {
					name,
					first_id: ids.start,
					value,
				})
			})
			.collect();
		Self {
			label,
			n_classes: table.n_classes(),
			features,
		}
	}

	pub fn label(&self) -> usize {
		self.label
	}

	pub fn features(&self) -> &[CompiledFeature] {
		&self.features
	}

	/// Iterate over every weight this instance touches. Each feature yields one weight per class, in label order, all carrying the feature's value.
	pub fn active_weights(&self) -> ActiveWeights<'_> {
		ActiveWeights {
			features: self.features.iter(),
			current: None,
			label: 0,
			n_classes: self.n_classes,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveWeight {
	pub id: usize,
	pub label: usize,
	pub value: f64,
}

/// The iterator returned by [`CompiledInstance::active_weights`](struct.CompiledInstance.html#method.active_weights).
#[derive(Clone)]
pub struct ActiveWeights<'a> {
	features: std::slice::Iter<'a, CompiledFeature>,
	current: Option<&'a CompiledFeature>,
	label: usize,
	n_classes: usize,
}

impl<'a> Iterator for ActiveWeights<'a> {
	type Item = ActiveWeight;

	fn next(&mut self) -> Option<ActiveWeight> {
		loop {
			match self.current {
				Some(feature) if self.label < self.n_classes => {
					let active_weight = ActiveWeight {
						id: feature.first_id + self.label,
						label: self.label,
						value: feature.value,
					};
					self.label += 1;
					return Some(active_weight);
				}
				_ => {
					self.current = Some(self.features.next()?);
					self.label = 0;
				}
			}
		}
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let remaining_in_current = if self.current.is_some() {
			self.n_classes.saturating_sub(self.label)
		} else {
			0
		};
		let len = remaining_in_current + self.features.len() * self.n_classes;
		(len, Some(len))
	}
}

impl<'a> ExactSizeIterator for ActiveWeights<'a> {}

#[test]
fn test_active_weights() {
	let mut table = FeatureTable::new(2);
	let first = CompiledInstance::compile(1, &[(7, 1.0)], &mut table);
	let second = CompiledInstance::compile(0, &[(3, 0.5), (7, 2.0)], &mut table);
	assert_eq!(first.label(), 1);
	assert_eq!(table.n_features(), 4);
	let active_weights: Vec<_> = second
		.active_weights()
		.map(|w| (w.id, w.label, w.value))
		.collect();
	insta::assert_debug_snapshot!(active_weights, @r###"
 [
     (
         2,
         0,
         0.5,
     ),
     (
         3,
         1,
         0.5,
     ),
     (
         0,
         0,
         2.0,
     ),
     (
         1,
         1,
         2.0,
     ),
 ]
 "###);
	let mut iter = second.active_weights();
	assert_eq!(iter.len(), 4);
	iter.next();
	assert_eq!(iter.len(), 3);
	// The sequence can be restarted and yields the same weights.
	let again: Vec<_> = second.active_weights().map(|w| w.id).collect();
	assert_eq!(again, vec![2, 3, 0, 1]);
}

#[test]
fn test_compile_frozen() {
	let mut table = FeatureTable::new(3);
	CompiledInstance::compile(0, &[(0, 1.0)], &mut table);
	let instance = CompiledInstance::compile_frozen(2, &[(5, 1.0), (0, 4.0)], &table);
	assert_eq!(table.n_features(), 3);
	assert_eq!(instance.features().len(), 1);
	assert_eq!(instance.active_weights().count(), 3);
	assert!(instance.active_weights().all(|w| w.value == 4.0));
}

#[test]
fn test_no_features() {
	let mut table = FeatureTable::new(2);
	let instance = CompiledInstance::compile(0, &[], &mut table);
	assert_eq!(instance.active_weights().next(), None);
}
