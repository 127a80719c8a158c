//! This module contains the main entrypoint to the maxent cli.

use self::{
	config::{load_config, Config},
	load::load_instances,
};
use anyhow::{Context, Result};
use clap::{Args, Parser};
use colored::Colorize;
use itertools::izip;
use maxent_linear::{
	MaxEnt, OptimMethod, OptimizerOptions, Progress, Regularization, SgdOptions, TrainOptions,
};
use std::{
	collections::BTreeMap,
	fs::File,
	io::{BufWriter, Write},
	path::PathBuf,
};

mod config;
mod load;

#[derive(Parser)]
#[clap(
	about = "Train and apply maximum entropy classifiers.",
	disable_help_subcommand = true
)]
enum Options {
	#[clap(name = "train")]
	Train(Box<TrainArgs>),
	#[clap(name = "predict")]
	Predict(Box<PredictArgs>),
}

#[derive(Args, Debug)]
#[clap(about = "train a model")]
#[clap(long_about = "train a maximum entropy model from a file of labeled instances")]
struct TrainArgs {
	#[clap(long, help = "the path to the training data, one instance per line")]
	train_data_file: PathBuf,
	#[clap(long, help = "the path to write the model file to")]
	model_file: PathBuf,
	#[clap(short, long, help = "the path to a YAML config file")]
	config: Option<PathBuf>,
	#[clap(long, help = "the optimization method [default: SGD]")]
	optim_method: Option<String>,
	#[clap(long, help = "the L1 regularization")]
	l1_reg: Option<f64>,
	#[clap(long, help = "the L2 regularization")]
	l2_reg: Option<f64>,
	#[clap(long, help = "the number of instances at the end of the training data to hold out")]
	num_heldout: Option<usize>,
	#[clap(long, help = "the number of epochs to train")]
	epochs: Option<usize>,
	#[clap(long, help = "the initial learning rate")]
	learning_rate: Option<f64>,
	#[clap(long, help = "the exponential decay of the learning rate per epoch")]
	decay: Option<f64>,
	#[clap(long, help = "the seed for shuffling the training instances")]
	seed: Option<u64>,
}

#[derive(Args, Debug)]
#[clap(about = "make predictions with a model")]
#[clap(long_about = "evaluate a model on a file of labeled instances and optionally write its predictions")]
struct PredictArgs {
	#[clap(long, help = "the path to the model file")]
	model_file: PathBuf,
	#[clap(long, help = "the path to the test data, one instance per line")]
	test_data_file: PathBuf,
	#[clap(short, long, help = "the path to write predictions to, one JSON object per line")]
	output: Option<PathBuf>,
}

fn main() {
	let env = env_logger::Env::default().default_filter_or("maxent=info");
	env_logger::Builder::from_env(env)
		.format_module_path(false)
		.format_timestamp(None)
		.init();
	let options = Options::parse();
	let result = match options {
		Options::Train(args) => cli_train(*args),
		Options::Predict(args) => cli_predict(*args),
	};
	if let Err(error) = result {
		eprintln!("{}: {:#}", "error".red().bold(), error);
		std::process::exit(1);
	}
}

fn cli_train(args: TrainArgs) -> Result<()> {
	// Check the options before loading any data.
	let config = load_config(args.config.as_deref())?;
	let options = train_options(&args, config.as_ref())?;
	options
		.optimizer
		.build()
		.validate(&options.regularization)?;

	log::info!("Load training data from {}", args.train_data_file.display());
	let instances = load_instances(&args.train_data_file)?;

	log::info!("MaxEnt model training.");
	let model = MaxEnt::train(&instances, &options, &mut log_progress)?;

	log::info!("Save model to {}", args.model_file.display());
	model
		.to_file(&args.model_file)
		.with_context(|| format!("failed to write model file {}", args.model_file.display()))?;
	Ok(())
}

/// Combine the command line flags, the config file, and the defaults into the options for training.
fn train_options(args: &TrainArgs, config: Option<&Config>) -> Result<TrainOptions> {
	let sgd_config = config.and_then(|config| config.sgd.as_ref());
	let optim_method = args
		.optim_method
		.as_deref()
		.or_else(|| config.and_then(|config| config.optim_method.as_deref()))
		.unwrap_or("SGD")
		.parse::<OptimMethod>()?;
	let optimizer = match optim_method {
		OptimMethod::Sgd => {
			let defaults = SgdOptions::default();
			OptimizerOptions::Sgd(SgdOptions {
				max_epochs: args
					.epochs
					.or_else(|| sgd_config.and_then(|sgd| sgd.max_epochs))
					.unwrap_or(defaults.max_epochs),
				learning_rate: args
					.learning_rate
					.or_else(|| sgd_config.and_then(|sgd| sgd.learning_rate))
					.unwrap_or(defaults.learning_rate),
				decay: args
					.decay
					.or_else(|| sgd_config.and_then(|sgd| sgd.decay))
					.unwrap_or(defaults.decay),
				seed: args
					.seed
					.or_else(|| sgd_config.and_then(|sgd| sgd.seed))
					.unwrap_or(defaults.seed),
			})
		}
	};
	let regularization = Regularization {
		l1: args
			.l1_reg
			.or_else(|| config.and_then(|config| config.l1_regularization))
			.unwrap_or(0.0),
		l2: args
			.l2_reg
			.or_else(|| config.and_then(|config| config.l2_regularization))
			.unwrap_or(0.0),
	};
	let num_heldout = args
		.num_heldout
		.or_else(|| config.and_then(|config| config.num_heldout))
		.unwrap_or(0);
	Ok(TrainOptions {
		regularization,
		num_heldout,
		optimizer,
	})
}

fn log_progress(progress: Progress) {
	match progress {
		Progress::Compiled {
			n_instances,
			n_heldout,
			n_classes,
			n_features,
		} => log::info!(
			"{} training instances, {} heldout instances, {} classes, {} features",
			n_instances,
			n_heldout,
			n_classes,
			n_features
		),
		Progress::Epoch(report) => {
			log::info!(
				"iter = {}, obj(err) = {}, accuracy = {}",
				report.epoch,
				report.objective,
				report.accuracy
			);
			if let Some(heldout) = report.heldout {
				log::info!(
					"\theldout_logl(err) = {}, accuracy = {}",
					heldout.negative_log_likelihood,
					heldout.accuracy
				);
			}
		}
	}
}

#[derive(serde::Serialize)]
struct PredictionOutput<'a> {
	label: &'a str,
	predicted: &'a str,
	probabilities: BTreeMap<&'a str, f64>,
}

fn cli_predict(args: PredictArgs) -> Result<()> {
	let model = MaxEnt::from_path(&args.model_file)
		.with_context(|| format!("failed to read model file {}", args.model_file.display()))?;
	let instances = load_instances(&args.test_data_file)?;
	match model.evaluate(&instances) {
		Some(evaluation) => log::info!(
			"logl(err) = {}, accuracy = {}",
			evaluation.negative_log_likelihood,
			evaluation.accuracy
		),
		None => log::warn!("there are no instances with a known label to evaluate"),
	}
	if let Some(output_path) = args.output {
		let file = File::create(&output_path)
			.with_context(|| format!("failed to create output file {}", output_path.display()))?;
		let mut writer = BufWriter::new(file);
		for instance in instances.iter() {
			let prediction = model.predict(instance);
			let probabilities = izip!(model.classes.names(), prediction.probabilities.iter())
				.map(|(class, probability)| (class.as_str(), *probability))
				.collect();
			let output = PredictionOutput {
				label: &instance.label,
				predicted: model.class_name(prediction.label),
				probabilities,
			};
			serde_json::to_writer(&mut writer, &output)?;
			writeln!(writer)?;
		}
		writer.flush()?;
		log::info!("Wrote predictions to {}", output_path.display());
	}
	Ok(())
}

#[cfg(test)]
fn train_args(flags: &[&str]) -> TrainArgs {
	let mut argv = vec!["maxent", "train", "--train-data-file", "data.txt", "--model-file", "m"];
	argv.extend_from_slice(flags);
	match Options::parse_from(argv) {
		Options::Train(args) => *args,
		Options::Predict(_) => unreachable!(),
	}
}

#[test]
fn test_train_options_defaults() {
	let options = train_options(&train_args(&[]), None).unwrap();
	assert_eq!(options, TrainOptions::default());
}

#[test]
fn test_train_options_precedence() {
	let config: Config = serde_yaml::from_str(
		r#"
l1_regularization: 0.5
num_heldout: 10
sgd:
  max_epochs: 20
  decay: 0.5
"#,
	)
	.unwrap();
	let args = train_args(&["--l1-reg", "0.25", "--epochs", "5", "--optim-method", "sgd"]);
	let options = train_options(&args, Some(&config)).unwrap();
	assert_eq!(
		options,
		TrainOptions {
			regularization: Regularization { l1: 0.25, l2: 0.0 },
			num_heldout: 10,
			optimizer: OptimizerOptions::Sgd(SgdOptions {
				max_epochs: 5,
				learning_rate: 1.0,
				decay: 0.5,
				seed: 42,
			}),
		}
	);
}

#[test]
fn test_unknown_optim_method() {
	let args = train_args(&["--optim-method", "OWLQN"]);
	let error = train_options(&args, None).unwrap_err();
	assert_eq!(
		error.to_string(),
		"unknown optimization method \"OWLQN\", the only supported method is SGD"
	);
}
