use super::{conditional_probability, CompiledInstance, FeatureTable};
use maxent_metrics::{Accuracy, CrossEntropy, CrossEntropyInput, StreamingMetric};
use ndarray::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Metrics computed over a set of instances without updating the weights.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
	/// the mean negative log of the probability assigned to the true label
	pub negative_log_likelihood: f64,
	pub accuracy: f64,
}

/**
Evaluate the current weights on `instances`. This only reads from `table`, so the instances are evaluated in parallel. Returns `None` if `instances` is empty.
*/
pub fn evaluate(table: &FeatureTable, instances: &[CompiledInstance]) -> Option<Evaluation> {
	let n_classes = table.n_classes();
	let (cross_entropy, accuracy) = instances
		.par_iter()
		.fold(
			|| {
				let probabilities = Array1::<f64>::zeros(n_classes);
				(probabilities, CrossEntropy::default(), Accuracy::new())
			},
			|mut state, instance| {
				let (probabilities, cross_entropy, accuracy) = &mut state;
				let label = conditional_probability(
					table.lambdas(),
					instance.features(),
					probabilities.view_mut(),
				);
				cross_entropy.update(CrossEntropyInput {
					probabilities: probabilities.view(),
					label: instance.label(),
				});
				accuracy.update((label, instance.label()));
				state
			},
		)
		.map(|(_, cross_entropy, accuracy)| (cross_entropy, accuracy))
		.reduce(
			|| (CrossEntropy::default(), Accuracy::new()),
			|(mut cross_entropy, mut accuracy), (other_cross_entropy, other_accuracy)| {
				cross_entropy.merge(other_cross_entropy);
				accuracy.merge(other_accuracy);
				(cross_entropy, accuracy)
			},
		);
	Some(Evaluation {
		negative_log_likelihood: cross_entropy.finalize()?,
		accuracy: accuracy.finalize()?,
	})
}

#[test]
fn test_evaluate() {
	let mut table = FeatureTable::new(2);
	let instances = vec![
		CompiledInstance::compile(0, &[(0, 1.0)], &mut table),
		CompiledInstance::compile(1, &[(0, 1.0)], &mut table),
		CompiledInstance::compile(1, &[(1, 1.0)], &mut table),
	];
	// feature 0 favors class 0, feature 1 favors class 1
	table.lambdas_mut().copy_from_slice(&[1.0, -1.0, -1.0, 1.0]);
	let evaluation = evaluate(&table, &instances).unwrap();
	let p = 1.0 / (1.0 + (-2.0f64).exp());
	let expected = -(p.ln() + (1.0 - p).ln() + p.ln()) / 3.0;
	assert!((evaluation.negative_log_likelihood - expected).abs() < 1e-12);
	assert!((evaluation.accuracy - 2.0 / 3.0).abs() < 1e-12);
	assert_eq!(evaluate(&table, &[]), None);
}
