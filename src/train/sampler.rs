use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// No-replacement index sampler for stochastic batches.
///
/// Holds a shuffled permutation of `0..n` and walks it with a cursor; when
/// the permutation is exhausted it reshuffles and starts over, so every
/// example is visited once per pass regardless of batch size.
#[derive(Debug, Clone)]
pub struct ShuffleSampler {
    order: Vec<usize>,
    cursor: usize,
}

impl ShuffleSampler {
    pub fn new(n: usize, rng: &mut StdRng) -> ShuffleSampler {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        ShuffleSampler { order, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Next index, reshuffling automatically when the pass is exhausted.
    pub fn sample_auto(&mut self, rng: &mut StdRng) -> usize {
        if self.cursor == self.order.len() {
            self.order.shuffle(rng);
            self.cursor = 0;
        }
        let index = self.order[self.cursor];
        self.cursor += 1;
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn one_pass_visits_every_index_once() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut sampler = ShuffleSampler::new(10, &mut rng);

        let mut seen = vec![false; 10];
        for _ in 0..10 {
            let i = sampler.sample_auto(&mut rng);
            assert!(!seen[i], "index {i} drawn twice in one pass");
            seen[i] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn reshuffles_after_exhaustion() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut sampler = ShuffleSampler::new(5, &mut rng);

        for _ in 0..5 {
            sampler.sample_auto(&mut rng);
        }
        // Second pass still covers everything.
        let mut seen = vec![false; 5];
        for _ in 0..5 {
            seen[sampler.sample_auto(&mut rng)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn fixed_seed_reproduces_the_sequence() {
        let mut rng_a = StdRng::seed_from_u64(3);
        let mut rng_b = StdRng::seed_from_u64(3);
        let mut a = ShuffleSampler::new(8, &mut rng_a);
        let mut b = ShuffleSampler::new(8, &mut rng_b);

        for _ in 0..20 {
            assert_eq!(a.sample_auto(&mut rng_a), b.sample_auto(&mut rng_b));
        }
    }
}
