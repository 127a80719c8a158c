/*!
This crate defines the [`StreamingMetric`](trait.StreamingMetric.html) trait and the metrics used to report the progress of training a maximum entropy model: [`Mean`](struct.Mean.html), [`Accuracy`](struct.Accuracy.html), and [`CrossEntropy`](struct.CrossEntropy.html).
*/

#![allow(clippy::tabs_in_doc_comments)]

mod accuracy;
mod cross_entropy;
mod mean;

pub use self::accuracy::Accuracy;
pub use self::cross_entropy::{CrossEntropy, CrossEntropyInput};
pub use self::mean::Mean;

/**
The `StreamingMetric` trait defines a common interface to metrics that are computed one example at a time, such as accuracy and cross entropy.

After being initialized, a value of type `T` implementing the `StreamingMetric` trait can have `update()` called on it with values of the associated type `Input`. Multiple values of `T` can be merged together by calling `merge()`, which is how a metric is computed across multiple threads. When finished aggregating, call `finalize()` to produce the associated type `Output`.

# Examples

Here is an implementation of a `Max` metric, which takes `f64`s as input and produces the largest of them.

```
use maxent_metrics::StreamingMetric;

struct Max(f64);

impl StreamingMetric<'_> for Max {
	type Input = f64;
	type Output = f64;
	fn update(&mut self, input: Self::Input) {
		self.0 = self.0.max(input)
	}
	fn merge(&mut self, other: Self) { self.0 = self.0.max(other.0) }
	fn finalize(self) -> Self::Output { self.0 }
}
```

The generic lifetime `'a` allows `Input`s to borrow from their enclosing scope, as [`CrossEntropyInput`](struct.CrossEntropyInput.html) does.
*/
pub trait StreamingMetric<'a> {
	/// `Input` is the type to aggregate in calls to `update()`.
	type Input;
	/// `Output` is the return type of `finalize()`.
	type Output;
	/// Update this streaming metric with the `Input` `input`.
	fn update(&mut self, input: Self::Input);
	/// Merge multiple independently computed streaming metrics.
	fn merge(&mut self, other: Self);
	/// When you are done aggregating `Input`s, call `finalize()` to produce an `Output`.
	fn finalize(self) -> Self::Output;
}
