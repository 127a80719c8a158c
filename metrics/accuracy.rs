use super::{mean::Mean, StreamingMetric};

/// The accuracy is the proportion of examples where the predicted label equals the true label.
#[derive(Clone, Debug, Default)]
pub struct Accuracy(Mean);

impl Accuracy {
	pub fn new() -> Self {
		Self::default()
	}
}

impl StreamingMetric<'_> for Accuracy {
	/// (predicted label, true label)
	type Input = (usize, usize);
	type Output = Option<f64>;

	fn update(&mut self, value: Self::Input) {
		self.0.update(if value.0 == value.1 { 1.0 } else { 0.0 })
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Option<f64> {
		self.0.finalize()
	}
}

#[test]
fn test_accuracy() {
	let mut accuracy = Accuracy::new();
	for input in &[(0, 0), (1, 0), (2, 2), (1, 1)] {
		accuracy.update(*input);
	}
	let mut other = Accuracy::new();
	other.update((0, 1));
	accuracy.merge(other);
	insta::assert_debug_snapshot!(accuracy.finalize(), @r###"
 Some(
     0.6,
 )
 "###);
}
