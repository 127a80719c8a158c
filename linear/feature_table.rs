use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A `Feature` is the pairing of a feature name with a class label. Each one owns exactly one weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
	pub name: usize,
	pub label: usize,
}

/**
The `FeatureTable` maps each (feature name, label) pair to the index of its weight, and owns the weights themselves.

The first time a feature name is resolved, one weight is created for every class, so the weights of a feature name occupy the contiguous range `first..first + n_classes`, ordered by label. The table only grows while instances are compiled for training. Once an optimizer starts, the weights change but the layout does not.
*/
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
	n_classes: usize,
	/// the first weight id of each feature name, indexed by feature name id
	offsets: Vec<Option<usize>>,
	/// the (feature name, label) pair of each weight, indexed by weight id
	features: Vec<Feature>,
	lambdas: Vec<f64>,
}

impl FeatureTable {
	pub fn new(n_classes: usize) -> Self {
		Self {
			n_classes,
			offsets: Vec::new(),
			features: Vec::new(),
			lambdas: Vec::new(),
		}
	}

	pub fn n_classes(&self) -> usize {
		self.n_classes
	}

	/// The number of weights, which is `n_classes` times the number of distinct feature names resolved so far.
	pub fn n_features(&self) -> usize {
		self.lambdas.len()
	}

	/// Retrieve the weight ids of the feature name `name`, creating them with an initial weight of zero if this is the first time `name` is seen.
	pub fn resolve_or_create(&mut self, name: usize) -> Range<usize> {
		if let Some(ids) = self.resolve(name) {
			return ids;
		}
		if name >= self.offsets.len() {
			self.offsets.resize(name + 1, None);
		}
		let first = self.lambdas.len();
		self.offsets[name] = Some(first);
		for label in 0..self.n_classes {
			self.features.push(Feature { name, label });
			self.lambdas.push(0.0);
		}
		first..first + self.n_classes
	}

	/// Retrieve the weight ids of the feature name `name` without creating them.
	pub fn resolve(&self, name: usize) -> Option<Range<usize>> {
		let first = self.offsets.get(name).copied().flatten()?;
		Some(first..first + self.n_classes)
	}

	pub fn feature_at(&self, id: usize) -> Feature {
		self.features[id]
	}

	pub fn weight_at(&self, id: usize) -> f64 {
		self.lambdas[id]
	}

	pub fn set_weight_at(&mut self, id: usize, value: f64) {
		self.lambdas[id] = value;
	}

	pub fn lambdas(&self) -> &[f64] {
		&self.lambdas
	}

	pub fn lambdas_mut(&mut self) -> &mut [f64] {
		&mut self.lambdas
	}

	/// The sum of the absolute values of all the weights.
	pub fn l1_norm(&self) -> f64 {
		self.lambdas.iter().map(|lambda| lambda.abs()).sum()
	}
}

#[test]
fn test_resolve_or_create() {
	let mut table = FeatureTable::new(3);
	assert_eq!(table.resolve_or_create(4), 0..3);
	assert_eq!(table.resolve_or_create(1), 3..6);
	assert_eq!(table.resolve_or_create(4), 0..3);
	assert_eq!(table.resolve(1), Some(3..6));
	assert_eq!(table.resolve(0), None);
	assert_eq!(table.resolve(9), None);
	assert_eq!(table.n_features(), 6);
	assert_eq!(table.feature_at(5), Feature { name: 1, label: 2 });
	assert!(table.lambdas().iter().all(|lambda| *lambda == 0.0));
}

#[test]
fn test_l1_norm() {
	let mut table = FeatureTable::new(2);
	table.resolve_or_create(0);
	table.resolve_or_create(1);
	table.set_weight_at(0, 1.5);
	table.set_weight_at(1, -2.0);
	table.set_weight_at(3, -0.25);
	assert_eq!(table.weight_at(1), -2.0);
	assert!((table.l1_norm() - 3.75).abs() < 1e-12);
}
