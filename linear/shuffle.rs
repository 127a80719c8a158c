use rand::{seq::SliceRandom, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

/// A `Shuffle` reorders the instance ids at the start of every epoch.
pub trait Shuffle {
	fn shuffle(&mut self, ids: &mut [usize]);
}

/// Uniformly random permutations from a seeded generator, so training is reproducible for a given seed.
pub struct RandomShuffle {
	rng: Xoshiro256Plus,
}

impl RandomShuffle {
	pub fn new(seed: u64) -> Self {
		Self {
			rng: Xoshiro256Plus::seed_from_u64(seed),
		}
	}
}

impl Shuffle for RandomShuffle {
	fn shuffle(&mut self, ids: &mut [usize]) {
		ids.shuffle(&mut self.rng);
	}
}

/// Leaves the ids in the order they are given.
pub struct InOrder;

impl Shuffle for InOrder {
	fn shuffle(&mut self, _ids: &mut [usize]) {}
}

#[test]
fn test_random_shuffle_is_a_seeded_permutation() {
	let mut a = RandomShuffle::new(42);
	let mut b = RandomShuffle::new(42);
	let mut ids_a: Vec<usize> = (0..100).collect();
	let mut ids_b = ids_a.clone();
	a.shuffle(&mut ids_a);
	b.shuffle(&mut ids_b);
	assert_eq!(ids_a, ids_b);
	assert_ne!(ids_a, (0..100).collect::<Vec<_>>());
	let mut sorted = ids_a.clone();
	sorted.sort_unstable();
	assert_eq!(sorted, (0..100).collect::<Vec<_>>());
}
