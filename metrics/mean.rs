use super::StreamingMetric;
use num_traits::ToPrimitive;

/// The arithmetic mean of a stream of values.
#[derive(Clone, Debug, Default)]
pub struct Mean {
	n: u64,
	mean: f64,
}

impl StreamingMetric<'_> for Mean {
	type Input = f64;
	type Output = Option<f64>;

	fn update(&mut self, value: f64) {
		self.n += 1;
		self.mean += (value - self.mean) / self.n.to_f64().unwrap();
	}

	fn merge(&mut self, other: Self) {
		let n = self.n + other.n;
		if n == 0 {
			return;
		}
		self.mean = (self.n.to_f64().unwrap() * self.mean + other.n.to_f64().unwrap() * other.mean)
			/ n.to_f64().unwrap();
		self.n = n;
	}

	fn finalize(self) -> Option<f64> {
		if self.n > 0 {
			Some(self.mean)
		} else {
			None
		}
	}
}

#[test]
fn test_mean() {
	let mut mean = Mean::default();
	for value in &[1.0, 2.0, 3.0, 4.0] {
		mean.update(*value);
	}
	assert!((mean.finalize().unwrap() - 2.5).abs() < 1e-12);
	assert_eq!(Mean::default().finalize(), None);
}

#[test]
fn test_merge() {
	let mut a = Mean::default();
	a.update(1.0);
	a.update(2.0);
	let mut b = Mean::default();
	b.update(6.0);
	a.merge(b);
	a.merge(Mean::default());
	assert!((a.finalize().unwrap() - 3.0).abs() < 1e-12);
}
