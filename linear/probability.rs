use super::{CompiledFeature, CompiledInstance, FeatureTable};
use itertools::izip;
use ndarray::prelude::*;

/// The conditional probability distribution over the classes for one instance, along with the most probable label.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
	/// (n_classes)
	pub probabilities: Array1<f64>,
	pub label: usize,
}

/**
Write the conditional probability of each class given `features` into `probabilities` and return the most probable label, breaking ties in favor of the lowest label.

The score of class `l` is the sum over the features of `weight(feature, l) * value`, and the probabilities are the softmax of the scores. `probabilities.len()` must equal the number of classes the weights were laid out for.
*/
pub fn conditional_probability(
	lambdas: &[f64],
	features: &[CompiledFeature],
	mut probabilities: ArrayViewMut1<f64>,
) -> usize {
	let n_classes = probabilities.len();
	probabilities.fill(0.0);
	for feature in features {
		let weights = &lambdas[feature.first_id..feature.first_id + n_classes];
		for (score, weight) in izip!(probabilities.iter_mut(), weights) {
			*score += weight * feature.value;
		}
	}
	softmax(probabilities.view_mut());
	argmax(probabilities.view())
}

impl FeatureTable {
	/// Compute the conditional probability distribution for `instance` under the current weights.
	pub fn predict(&self, instance: &CompiledInstance) -> Prediction {
		let mut probabilities = Array1::zeros(self.n_classes());
		let label = conditional_probability(
			self.lambdas(),
			instance.features(),
			probabilities.view_mut(),
		);
		Prediction {
			probabilities,
			label,
		}
	}
}

fn softmax(mut logits: ArrayViewMut1<f64>) {
	// Subtracting the max keeps exp() from overflowing.
	let max = logits.iter().fold(std::f64::NEG_INFINITY, |a, &b| a.max(b));
	logits -= max;
	logits.mapv_inplace(|logit| logit.exp());
	let sum = logits.sum();
	logits /= sum;
}

fn argmax(probabilities: ArrayView1<f64>) -> usize {
	let mut best = 0;
	for (label, probability) in probabilities.iter().enumerate().skip(1) {
		if *probability > probabilities[best] {
			best = label;
		}
	}
	best
}

#[cfg(test)]
fn table_with_weights(n_classes: usize, n_names: usize, lambdas: &[f64]) -> FeatureTable {
	let mut table = FeatureTable::new(n_classes);
	for name in 0..n_names {
		table.resolve_or_create(name);
	}
	table.lambdas_mut().copy_from_slice(lambdas);
	table
}

#[test]
fn test_two_classes() {
	// scores: class 0 = 1.0 * 2.0 + -1.0 * 1.0 = 1.0, class 1 = 0.0
	let table = table_with_weights(2, 2, &[1.0, 0.0, -1.0, 0.0]);
	let instance = CompiledInstance::compile_frozen(0, &[(0, 2.0), (1, 1.0)], &table);
	let prediction = table.predict(&instance);
	let expected = 1.0 / (1.0 + (-1.0f64).exp());
	assert!((prediction.probabilities[0] - expected).abs() < 1e-12);
	assert!((prediction.probabilities[1] - (1.0 - expected)).abs() < 1e-12);
	assert_eq!(prediction.label, 0);
}

#[test]
fn test_normalization() {
	use rand::{Rng, SeedableRng};
	let mut rng = rand_xoshiro::Xoshiro256Plus::seed_from_u64(7);
	for _ in 0..100 {
		let n_classes = rng.gen_range(1, 6);
		let n_names = rng.gen_range(1, 5);
		let lambdas: Vec<f64> = (0..n_classes * n_names)
			.map(|_| rng.gen_range(-20.0, 20.0))
			.collect();
		let table = table_with_weights(n_classes, n_names, &lambdas);
		let features: Vec<(usize, f64)> = (0..n_names)
			.map(|name| (name, rng.gen_range(-3.0, 3.0)))
			.collect();
		let instance = CompiledInstance::compile_frozen(0, &features, &table);
		let prediction = table.predict(&instance);
		assert!((prediction.probabilities.sum() - 1.0).abs() < 1e-9);
		assert!(prediction
			.probabilities
			.iter()
			.all(|probability| (0.0..=1.0).contains(probability)));
	}
}

#[test]
fn test_large_scores_do_not_overflow() {
	let table = table_with_weights(3, 1, &[1000.0, 1001.0, -1000.0]);
	let instance = CompiledInstance::compile_frozen(0, &[(0, 5.0)], &table);
	let prediction = table.predict(&instance);
	assert!(prediction.probabilities.iter().all(|p| p.is_finite()));
	assert!((prediction.probabilities.sum() - 1.0).abs() < 1e-12);
	assert_eq!(prediction.label, 1);
}

#[test]
fn test_ties_go_to_the_lowest_label() {
	let table = table_with_weights(3, 1, &[0.0, 2.0, 2.0]);
	let instance = CompiledInstance::compile_frozen(0, &[(0, 1.0)], &table);
	assert_eq!(table.predict(&instance).label, 1);
	let empty = CompiledInstance::compile_frozen(0, &[], &table);
	let prediction = table.predict(&empty);
	assert_eq!(prediction.label, 0);
	assert!(prediction
		.probabilities
		.iter()
		.all(|p| (p - 1.0 / 3.0).abs() < 1e-12));
}
