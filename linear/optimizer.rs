use super::{
	evaluate::Evaluation,
	sgd::{Sgd, SgdOptions},
	shuffle::RandomShuffle,
	CompiledInstance, Error, FeatureTable, Progress, Regularization,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/**
An `Optimizer` fits the weights of a [`FeatureTable`](struct.FeatureTable.html) to a set of compiled instances by minimizing the regularized negative log likelihood.

Implementations must reject an unsupported configuration in `validate()`, and `optimize()` must call it before changing any weight.
*/
pub trait Optimizer {
	fn validate(&self, regularization: &Regularization) -> Result<(), Error>;

	/// Update the weights in `table`. The instances in `heldout` are only used to report metrics after each epoch.
	fn optimize(
		&mut self,
		instances: &[CompiledInstance],
		heldout: &[CompiledInstance],
		table: &mut FeatureTable,
		regularization: &Regularization,
		update_progress: &mut dyn FnMut(Progress),
	) -> Result<Vec<EpochReport>, Error>;
}

/// The diagnostics reported at the end of each epoch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochReport {
	/// 1-indexed
	pub epoch: usize,
	/// the mean negative log likelihood over the training instances, plus the L1 penalty if L1 regularization is enabled
	pub objective: f64,
	pub accuracy: f64,
	pub heldout: Option<Evaluation>,
}

/// The optimizer to train with, and its options.
#[derive(Clone, Debug, PartialEq)]
pub enum OptimizerOptions {
	Sgd(SgdOptions),
}

impl Default for OptimizerOptions {
	fn default() -> Self {
		OptimizerOptions::Sgd(SgdOptions::default())
	}
}

impl OptimizerOptions {
	pub fn build(&self) -> Box<dyn Optimizer> {
		match self {
			OptimizerOptions::Sgd(options) => {
				Box::new(Sgd::new(options.clone(), RandomShuffle::new(options.seed)))
			}
		}
	}
}

/// The name of an optimization method, as given on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptimMethod {
	Sgd,
}

impl FromStr for OptimMethod {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.eq_ignore_ascii_case("sgd") {
			Ok(OptimMethod::Sgd)
		} else {
			Err(Error::UnknownOptimizer(s.to_owned()))
		}
	}
}

#[test]
fn test_optim_method() {
	assert_eq!("SGD".parse::<OptimMethod>().unwrap(), OptimMethod::Sgd);
	assert_eq!("sgd".parse::<OptimMethod>().unwrap(), OptimMethod::Sgd);
	let error = "LBFGS".parse::<OptimMethod>().unwrap_err();
	assert!(matches!(error, Error::UnknownOptimizer(ref name) if name == "LBFGS"));
}
