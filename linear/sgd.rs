/*!
Stochastic gradient descent with a batch size of one and L1 regularization by cumulative penalty.

Applying the L1 penalty to every weight after every example would cost time proportional to the number of weights per example. Instead, `u` accumulates the total penalty every weight should have received so far, `q[i]` records the penalty weight `i` has actually received, and the difference is applied to a weight when an example next touches it. The penalty never moves a weight past zero.

See Yoshimasa Tsuruoka, Jun'ichi Tsujii, and Sophia Ananiadou. 2009. Stochastic Gradient Descent Training for L1-regularized Log-linear Models with Cumulative Penalty. In Proceedings of ACL-IJCNLP.
*/

use super::{
	conditional_probability, evaluate::evaluate, shuffle::Shuffle, CompiledInstance, EpochReport,
	Error, FeatureTable, Optimizer, Progress, Regularization,
};
use maxent_metrics::{Accuracy, CrossEntropy, CrossEntropyInput, StreamingMetric};
use ndarray::prelude::*;
use num_traits::ToPrimitive;

#[derive(Clone, Debug, PartialEq)]
pub struct SgdOptions {
	/// The number of passes over the training instances. There is no other stopping criterion.
	pub max_epochs: usize,
	/// The learning rate for the first example, `eta_0`.
	pub learning_rate: f64,
	/// The learning rate after `t` examples is `eta_0 * decay^(t / n_instances)`. Must be in (0, 1).
	pub decay: f64,
	/// The seed for shuffling the instances each epoch.
	pub seed: u64,
}

impl Default for SgdOptions {
	fn default() -> Self {
		Self {
			max_epochs: 50,
			learning_rate: 1.0,
			decay: 0.85,
			seed: 42,
		}
	}
}

pub struct Sgd<S> {
	options: SgdOptions,
	shuffle: S,
}

impl<S> Sgd<S>
where
	S: Shuffle,
{
	pub fn new(options: SgdOptions, shuffle: S) -> Self {
		Self { options, shuffle }
	}
}

/// The learning rate for the example at global step `t`, counted across all epochs.
pub fn learning_rate(learning_rate: f64, decay: f64, t: usize, n_instances: usize) -> f64 {
	learning_rate * decay.powf(t.to_f64().unwrap() / n_instances.to_f64().unwrap())
}

/// The cumulative L1 penalty state for one training run.
#[derive(Clone, Debug)]
pub struct CumulativePenalty {
	/// the total penalty every weight should have received so far
	u: f64,
	/// the signed penalty actually applied to each weight so far
	q: Vec<f64>,
}

impl CumulativePenalty {
	pub fn new(n_weights: usize) -> Self {
		Self {
			u: 0.0,
			q: vec![0.0; n_weights],
		}
	}

	pub fn accumulate(&mut self, penalty: f64) {
		self.u += penalty;
	}

	/// Bring weight `id` up to date with the accumulated penalty, clamping it at zero.
	pub fn apply(&mut self, id: usize, lambdas: &mut [f64]) {
		let weight = &mut lambdas[id];
		let z = *weight;
		if *weight > 0.0 {
			*weight = f64::max(0.0, *weight - (self.u + self.q[id]));
		} else if *weight < 0.0 {
			*weight = f64::min(0.0, *weight + (self.u - self.q[id]));
		}
		self.q[id] += *weight - z;
	}
}

impl<S> Optimizer for Sgd<S>
where
	S: Shuffle,
{
	fn validate(&self, regularization: &Regularization) -> Result<(), Error> {
		regularization.validate()?;
		if regularization.l2 > 0.0 {
			return Err(Error::L2RegularizationUnsupported(regularization.l2));
		}
		let decay = self.options.decay;
		if !(decay > 0.0 && decay < 1.0) {
			return Err(Error::InvalidDecay(decay));
		}
		let learning_rate = self.options.learning_rate;
		if !(learning_rate.is_finite() && learning_rate > 0.0) {
			return Err(Error::InvalidLearningRate(learning_rate));
		}
		Ok(())
	}

	fn optimize(
		&mut self,
		instances: &[CompiledInstance],
		heldout: &[CompiledInstance],
		table: &mut FeatureTable,
		regularization: &Regularization,
		update_progress: &mut dyn FnMut(Progress),
	) -> Result<Vec<EpochReport>, Error> {
		self.validate(regularization)?;
		if instances.is_empty() {
			return Err(Error::EmptyTrainingSet);
		}
		log::debug!(
			"performing SGD with eta0 = {}, alpha = {}, l1 = {}",
			self.options.learning_rate,
			self.options.decay,
			regularization.l1,
		);
		let n_instances = instances.len();
		let l1 = regularization.l1;
		let mut instance_ids: Vec<usize> = (0..n_instances).collect();
		let mut penalty = CumulativePenalty::new(table.n_features());
		let mut probabilities = Array1::<f64>::zeros(table.n_classes());
		let mut reports = Vec::with_capacity(self.options.max_epochs);
		// The step counter is not reset between epochs, so the learning rate keeps decaying.
		let mut t = 0;
		for epoch in 0..self.options.max_epochs {
			self.shuffle.shuffle(&mut instance_ids);
			let mut cross_entropy = CrossEntropy::default();
			let mut accuracy = Accuracy::new();
			for instance_id in instance_ids.iter() {
				let instance = &instances[*instance_id];
				let predicted_label = conditional_probability(
					table.lambdas(),
					instance.features(),
					probabilities.view_mut(),
				);
				cross_entropy.update(CrossEntropyInput {
					probabilities: probabilities.view(),
					label: instance.label(),
				});
				accuracy.update((predicted_label, instance.label()));
				let eta = learning_rate(
					self.options.learning_rate,
					self.options.decay,
					t,
					n_instances,
				);
				penalty.accumulate(eta * l1);
				let lambdas = table.lambdas_mut();
				for weight in instance.active_weights() {
					let model_expectation = probabilities[weight.label];
					let empirical_expectation = if weight.label == instance.label() {
						1.0
					} else {
						0.0
					};
					let gradient = (model_expectation - empirical_expectation) * weight.value;
					lambdas[weight.id] -= eta * gradient;
					penalty.apply(weight.id, lambdas);
				}
				t += 1;
			}
			let mut objective = cross_entropy.finalize().unwrap_or(0.0);
			if l1 > 0.0 {
				objective += l1 * table.l1_norm();
			}
			let report = EpochReport {
				epoch: epoch + 1,
				objective,
				accuracy: accuracy.finalize().unwrap_or(0.0),
				heldout: evaluate(table, heldout),
			};
			update_progress(Progress::Epoch(report.clone()));
			reports.push(report);
		}
		Ok(reports)
	}
}

#[cfg(test)]
fn compile(table: &mut FeatureTable, instances: &[(usize, &[(usize, f64)])]) -> Vec<CompiledInstance> {
	instances
		.iter()
		.map(|(label, features)| CompiledInstance::compile(*label, features, table))
		.collect()
}

#[cfg(test)]
fn sgd_options(max_epochs: usize) -> SgdOptions {
	SgdOptions {
		max_epochs,
		..Default::default()
	}
}

#[test]
fn test_penalty_clamps_at_zero() {
	let mut lambdas = vec![0.3, -0.3, 0.0, 2.0];
	let mut penalty = CumulativePenalty::new(lambdas.len());
	penalty.accumulate(0.5);
	for id in 0..lambdas.len() {
		penalty.apply(id, &mut lambdas);
	}
	assert_eq!(lambdas, vec![0.0, 0.0, 0.0, 1.5]);
	// The weight that reached zero received only part of its penalty.
	assert!((penalty.q[0] - -0.3).abs() < 1e-12);
	assert!((penalty.q[1] - 0.3).abs() < 1e-12);
	assert!((penalty.q[3] - -0.5).abs() < 1e-12);
	// Applying again without new penalty changes nothing.
	penalty.apply(3, &mut lambdas);
	assert_eq!(lambdas[3], 1.5);
}

#[test]
fn test_penalty_never_changes_sign() {
	use rand::{Rng, SeedableRng};
	let mut rng = rand_xoshiro::Xoshiro256Plus::seed_from_u64(0);
	let n_weights = 8;
	let mut lambdas: Vec<f64> = (0..n_weights).map(|_| rng.gen_range(-1.0, 1.0)).collect();
	let mut penalty = CumulativePenalty::new(n_weights);
	for _ in 0..10_000 {
		penalty.accumulate(rng.gen_range(0.0, 0.01));
		let id = rng.gen_range(0, n_weights);
		lambdas[id] += rng.gen_range(-0.5, 0.5);
		let before = lambdas[id];
		penalty.apply(id, &mut lambdas);
		let after = lambdas[id];
		assert!(after == 0.0 || after.signum() == before.signum());
		assert!(after.abs() <= before.abs());
	}
}

#[test]
fn test_lazy_penalty_matches_eager_penalty() {
	let l1 = 0.01;
	let n_instances = 4;
	let initial = [1.0, -1.0, 0.5, -0.5, 0.02];
	// (weight id, gradient) for the weights touched at each step
	let steps: [&[(usize, f64)]; 8] = [
		&[(0, -0.2), (1, 0.1)],
		&[(2, -0.1)],
		&[(0, -0.1), (3, 0.05)],
		&[(1, 0.2), (2, -0.05)],
		&[(0, -0.1)],
		&[(3, 0.1), (1, 0.1)],
		&[(2, -0.1)],
		&[(0, -0.05), (3, 0.05)],
	];
	let mut eager = initial.to_vec();
	let mut lazy = initial.to_vec();
	let mut penalty = CumulativePenalty::new(lazy.len());
	for (t, step) in steps.iter().enumerate() {
		let eta = learning_rate(1.0, 0.85, t, n_instances);
		for &(id, gradient) in step.iter() {
			eager[id] -= eta * gradient;
		}
		for weight in eager.iter_mut() {
			*weight = if *weight > 0.0 {
				f64::max(0.0, *weight - eta * l1)
			} else {
				f64::min(0.0, *weight + eta * l1)
			};
		}
		penalty.accumulate(eta * l1);
		for &(id, gradient) in step.iter() {
			lazy[id] -= eta * gradient;
			penalty.apply(id, &mut lazy);
			assert!((lazy[id] - eager[id]).abs() < 1e-12);
		}
	}
	// Bring the weights that were not touched in the last step up to date.
	for id in 0..lazy.len() {
		penalty.apply(id, &mut lazy);
	}
	for (lazy, eager) in lazy.iter().zip(eager.iter()) {
		assert!((lazy - eager).abs() < 1e-12);
	}
	assert_eq!(lazy[4], 0.0);
}

#[test]
fn test_learning_rate_decays_across_epochs() {
	assert_eq!(learning_rate(1.0, 0.85, 0, 3), 1.0);
	assert!((learning_rate(1.0, 0.85, 3, 3) - 0.85).abs() < 1e-12);
	assert!((learning_rate(2.0, 0.85, 6, 3) - 2.0 * 0.85 * 0.85).abs() < 1e-12);
	assert!(learning_rate(1.0, 0.85, 4, 3) < learning_rate(1.0, 0.85, 1, 3));
}

#[test]
fn test_one_epoch_trace() {
	// features: a = 0, b = 1
	// weights: (a, 0) = 0, (a, 1) = 1, (b, 0) = 2, (b, 1) = 3
	let mut table = FeatureTable::new(2);
	let instances = compile(
		&mut table,
		&[(0, &[(0, 1.0)]), (1, &[(1, 1.0)]), (0, &[(0, 1.0), (1, 1.0)])],
	);
	let mut sgd = Sgd::new(sgd_options(1), crate::shuffle::InOrder);
	sgd.optimize(
		&instances,
		&[],
		&mut table,
		&Regularization::default(),
		&mut |_| {},
	)
	.unwrap();
	// step 0: eta = 1, p = (0.5, 0.5), so (a, 0) = 0.5 and (a, 1) = -0.5
	// step 1: eta = 0.85^(1/3), p = (0.5, 0.5), so (b, 0) = -0.5 eta and (b, 1) = 0.5 eta
	// step 2: eta = 0.85^(2/3), both features move toward class 0 by eta * (1 - p_0)
	let eta_1 = 0.85f64.powf(1.0 / 3.0);
	let eta_2 = 0.85f64.powf(2.0 / 3.0);
	let score = 0.5 - 0.5 * eta_1;
	let p_0 = 1.0 / (1.0 + (-2.0 * score).exp());
	let expected = [
		0.5 + eta_2 * (1.0 - p_0),
		-0.5 - eta_2 * (1.0 - p_0),
		-0.5 * eta_1 + eta_2 * (1.0 - p_0),
		0.5 * eta_1 - eta_2 * (1.0 - p_0),
	];
	let reference = [
		0.9368320186125374,
		-0.9368320186125375,
		-0.036802099980417335,
		0.03680209998041728,
	];
	for ((lambda, expected), reference) in table
		.lambdas()
		.iter()
		.zip(expected.iter())
		.zip(reference.iter())
	{
		assert!((lambda - expected).abs() < 1e-12);
		assert!((lambda - reference).abs() < 1e-12);
	}
}

#[test]
fn test_two_epoch_trace() {
	let mut table = FeatureTable::new(2);
	let instances = compile(
		&mut table,
		&[(0, &[(0, 1.0)]), (1, &[(1, 1.0)]), (0, &[(0, 1.0), (1, 1.0)])],
	);
	let mut sgd = Sgd::new(sgd_options(2), crate::shuffle::InOrder);
	let reports = sgd
		.optimize(
			&instances,
			&[],
			&mut table,
			&Regularization::default(),
			&mut |_| {},
		)
		.unwrap();
	let reference = [
		1.219734501783732,
		-1.2197345017837322,
		-0.25482976437926674,
		0.2548297643792667,
	];
	for (lambda, reference) in table.lambdas().iter().zip(reference.iter()) {
		assert!((lambda - reference).abs() < 1e-12);
	}
	assert_eq!(reports.len(), 2);
	assert_eq!(reports[1].epoch, 2);
	assert!(reports[1].objective < reports[0].objective);
	assert!(reports.iter().all(|report| report.heldout.is_none()));
}

#[test]
fn test_l2_regularization_is_rejected_before_training() {
	let mut table = FeatureTable::new(2);
	let instances = compile(&mut table, &[(0, &[(0, 1.0)]), (1, &[(1, 1.0)])]);
	table.lambdas_mut().copy_from_slice(&[0.25, -0.25, 0.5, -0.5]);
	let before = table.clone();
	let regularization = Regularization { l1: 0.1, l2: 0.1 };
	let mut sgd = Sgd::new(sgd_options(5), crate::shuffle::InOrder);
	let mut n_progress_updates = 0;
	let result = sgd.optimize(&instances, &[], &mut table, &regularization, &mut |_| {
		n_progress_updates += 1
	});
	assert!(matches!(result, Err(Error::L2RegularizationUnsupported(l2)) if l2 == 0.1));
	assert_eq!(table, before);
	assert_eq!(n_progress_updates, 0);
}

#[test]
fn test_invalid_options_are_rejected() {
	let mut table = FeatureTable::new(2);
	let regularization = Regularization::default();
	let mut sgd = Sgd::new(sgd_options(5), crate::shuffle::InOrder);
	let result = sgd.optimize(&[], &[], &mut table, &regularization, &mut |_| {});
	assert!(matches!(result, Err(Error::EmptyTrainingSet)));
	let instances = compile(&mut table, &[(0, &[(0, 1.0)])]);
	for decay in &[0.0, 1.0, 1.5, std::f64::NAN] {
		let options = SgdOptions {
			decay: *decay,
			..Default::default()
		};
		let mut sgd = Sgd::new(options, crate::shuffle::InOrder);
		let result = sgd.optimize(&instances, &[], &mut table, &regularization, &mut |_| {});
		assert!(matches!(result, Err(Error::InvalidDecay(_))));
	}
	let options = SgdOptions {
		learning_rate: 0.0,
		..Default::default()
	};
	let mut sgd = Sgd::new(options, crate::shuffle::InOrder);
	let result = sgd.optimize(&instances, &[], &mut table, &regularization, &mut |_| {});
	assert!(matches!(result, Err(Error::InvalidLearningRate(_))));
	let negative = Regularization { l1: -1.0, l2: 0.0 };
	let sgd = Sgd::new(sgd_options(1), crate::shuffle::InOrder);
	assert!(matches!(
		sgd.validate(&negative),
		Err(Error::InvalidRegularization { .. })
	));
}

#[test]
fn test_uninformative_feature_is_zeroed_by_l1() {
	// features: x = 0, y = 1, and c = 2, which is present with the same value in every instance
	let mut table = FeatureTable::new(2);
	let a: &[(usize, f64)] = &[(0, 1.0), (2, 1.0)];
	let b: &[(usize, f64)] = &[(1, 1.0), (2, 1.0)];
	let instances = compile(
		&mut table,
		&[(0, a), (0, a), (0, a), (0, a), (1, b), (1, b), (1, b), (1, b)],
	);
	let mut sgd = Sgd::new(sgd_options(50), crate::shuffle::RandomShuffle::new(42));
	let regularization = Regularization { l1: 0.02, l2: 0.0 };
	sgd.optimize(&instances, &[], &mut table, &regularization, &mut |_| {})
		.unwrap();
	let c = table.resolve(2).unwrap();
	assert_eq!(table.lambdas()[c], [0.0, 0.0]);
	let x = table.resolve(0).unwrap();
	assert!(table.weight_at(x.start) > 1.0);
	assert!(table.weight_at(x.start + 1) < -1.0);
}

#[test]
fn test_heldout_does_not_change_weights() {
	let train = |with_heldout: bool| {
		let mut table = FeatureTable::new(3);
		let instances = compile(
			&mut table,
			&[
				(0, &[(0, 1.0), (3, 0.5)]),
				(1, &[(1, 1.0), (3, 0.5)]),
				(2, &[(2, 1.0)]),
				(0, &[(0, 2.0), (1, 0.5)]),
				(1, &[(1, 1.0), (2, 0.25)]),
			],
		);
		let heldout = vec![
			CompiledInstance::compile_frozen(0, &[(0, 1.0), (9, 1.0)], &table),
			CompiledInstance::compile_frozen(2, &[(2, 1.0), (3, 1.0)], &table),
		];
		let heldout: &[CompiledInstance] = if with_heldout { &heldout } else { &[] };
		let mut sgd = Sgd::new(sgd_options(10), crate::shuffle::RandomShuffle::new(7));
		let regularization = Regularization { l1: 0.01, l2: 0.0 };
		let reports = sgd
			.optimize(&instances, heldout, &mut table, &regularization, &mut |_| {})
			.unwrap();
		(table, reports)
	};
	let (with, with_reports) = train(true);
	let (without, without_reports) = train(false);
	let with_bits: Vec<u64> = with.lambdas().iter().map(|lambda| lambda.to_bits()).collect();
	let without_bits: Vec<u64> = without
		.lambdas()
		.iter()
		.map(|lambda| lambda.to_bits())
		.collect();
	assert_eq!(with_bits, without_bits);
	assert!(with_reports.iter().all(|report| report.heldout.is_some()));
	assert!(without_reports.iter().all(|report| report.heldout.is_none()));
}
