/*!
This crate trains multinomial logistic regression ("maximum entropy") classifiers on sparse, named features.

An [`Instance`](struct.Instance.html) is compiled against a [`FeatureTable`](struct.FeatureTable.html), which assigns one weight to every (feature name, class label) pair. An [`Optimizer`](trait.Optimizer.html) then fits the weights. The optimizer provided here is [`Sgd`](struct.Sgd.html), stochastic gradient descent with L1 regularization applied by cumulative penalty. [`MaxEnt`](struct.MaxEnt.html) ties these together and can be written to and read from a model file.

Training is sequential. Each example's update reads the weights written by the previous example, so the examples in an epoch cannot be processed in parallel without changing the algorithm. Only evaluation on heldout instances, which happens between epochs and does not write to the weights, runs in parallel.
*/

#![allow(clippy::tabs_in_doc_comments)]

use thiserror::Error;

mod compiled_instance;
mod evaluate;
mod feature_table;
mod instance;
mod maxent;
mod optimizer;
mod probability;
mod sgd;
mod shuffle;
mod vocabulary;

pub use self::compiled_instance::{ActiveWeight, ActiveWeights, CompiledFeature, CompiledInstance};
pub use self::evaluate::{evaluate, Evaluation};
pub use self::feature_table::{Feature, FeatureTable};
pub use self::instance::{Instance, ParseInstanceError};
pub use self::maxent::MaxEnt;
pub use self::optimizer::{EpochReport, OptimMethod, Optimizer, OptimizerOptions};
pub use self::probability::{conditional_probability, Prediction};
pub use self::sgd::{learning_rate, CumulativePenalty, Sgd, SgdOptions};
pub use self::shuffle::{InOrder, RandomShuffle, Shuffle};
pub use self::vocabulary::Vocabulary;

/// These are the options passed to [`MaxEnt::train`](struct.MaxEnt.html#method.train).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainOptions {
	pub regularization: Regularization,
	/// The number of instances at the end of the input to hold out from training. They are evaluated after each epoch.
	pub num_heldout: usize,
	pub optimizer: OptimizerOptions,
}

/// The coefficients of the L1 and L2 penalties added to the negative log likelihood. Both must be finite and non-negative.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Regularization {
	pub l1: f64,
	pub l2: f64,
}

impl Regularization {
	pub fn validate(&self) -> Result<(), Error> {
		for (name, value) in [("l1", self.l1), ("l2", self.l2)].iter() {
			if !(value.is_finite() && *value >= 0.0) {
				return Err(Error::InvalidRegularization {
					name: *name,
					value: *value,
				});
			}
		}
		Ok(())
	}
}

/// Training reports its progress by calling `update_progress` with these values.
#[derive(Clone, Debug, PartialEq)]
pub enum Progress {
	/// The instances have been compiled and the layout of the weights is final.
	Compiled {
		n_instances: usize,
		n_heldout: usize,
		n_classes: usize,
		n_features: usize,
	},
	/// An epoch has finished.
	Epoch(EpochReport),
}

#[derive(Debug, Error)]
pub enum Error {
	#[error("L2 regularization is not supported by the SGD optimizer (l2 = {0})")]
	L2RegularizationUnsupported(f64),
	#[error("the {name} regularization must be finite and non-negative, got {value}")]
	InvalidRegularization { name: &'static str, value: f64 },
	#[error("the learning rate decay must be between 0 and 1 exclusive, got {0}")]
	InvalidDecay(f64),
	#[error("the learning rate must be finite and positive, got {0}")]
	InvalidLearningRate(f64),
	#[error("there are no instances to train on")]
	EmptyTrainingSet,
	#[error("unknown optimization method \"{0}\", the only supported method is SGD")]
	UnknownOptimizer(String),
	#[error("the model file is empty")]
	EmptyModelFile,
	#[error("unknown model format version {0}")]
	UnknownFormatVersion(u8),
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Encode(#[from] rmp_serde::encode::Error),
	#[error(transparent)]
	Decode(#[from] rmp_serde::decode::Error),
}

#[test]
fn test_regularization_validate() {
	assert!(Regularization { l1: 0.5, l2: 0.0 }.validate().is_ok());
	assert!(matches!(
		Regularization { l1: 0.0, l2: -1.0 }.validate(),
		Err(Error::InvalidRegularization { name: "l2", .. })
	));
	assert!(matches!(
		Regularization {
			l1: std::f64::INFINITY,
			l2: 0.0
		}
		.validate(),
		Err(Error::InvalidRegularization { name: "l1", .. })
	));
}
