use super::{mean::Mean, StreamingMetric};
use ndarray::prelude::*;

/// CrossEntropy is the loss minimized when training a multinomial logistic regression model: the mean over all examples of the negative log of the probability assigned to the true label. [Learn more](https://en.wikipedia.org/wiki/Cross_entropy#Cross-entropy_loss_function_and_logistic_regression).
#[derive(Clone, Debug, Default)]
pub struct CrossEntropy(Mean);

/// The input to [CrossEntropy](struct.CrossEntropy.html).
pub struct CrossEntropyInput<'a> {
	/// (n_classes)
	pub probabilities: ArrayView1<'a, f64>,
	/// 0-indexed
	pub label: usize,
}

impl<'a> StreamingMetric<'a> for CrossEntropy {
	type Input = CrossEntropyInput<'a>;
	type Output = Option<f64>;

	fn update(&mut self, value: CrossEntropyInput) {
		// A probability of exactly zero would make the loss infinite.
		let probability = value.probabilities[value.label].max(std::f64::MIN_POSITIVE);
		self.0.update(-probability.ln())
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Option<f64> {
		self.0.finalize()
	}
}

#[test]
fn test_cross_entropy() {
	let probabilities = arr2(&[[0.5, 0.25, 0.25], [0.1, 0.8, 0.1]]);
	let labels = [0, 1];
	let mut metric = CrossEntropy::default();
	for (probabilities, label) in probabilities.genrows().into_iter().zip(labels.iter()) {
		metric.update(CrossEntropyInput {
			probabilities,
			label: *label,
		});
	}
	let expected = -(0.5f64.ln() + 0.8f64.ln()) / 2.0;
	assert!((metric.finalize().unwrap() - expected).abs() < 1e-12);
}

#[test]
fn test_zero_probability_is_finite() {
	let probabilities = arr1(&[1.0, 0.0]);
	let mut metric = CrossEntropy::default();
	metric.update(CrossEntropyInput {
		probabilities: probabilities.view(),
		label: 1,
	});
	assert!(metric.finalize().unwrap().is_finite());
}
