//! Seeded pseudo-random source shared by every stochastic draw in the engine
//! (spec.md §4.1). The Simulation Loop owns one `SimRng` and hands out `&mut`
//! borrows for the duration of a single handler dispatch (spec.md §5: single-writer,
//! no suspension points within a handler).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug)]
pub struct SimRng {
    inner: StdRng,
}

impl SimRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        self.inner.gen_range(lo..hi)
    }

    pub fn uniform_i(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        self.inner.gen_range(lo..hi)
    }

    pub fn bool_with_prob(&mut self, p: f64) -> bool {
        self.inner.gen_bool(p.clamp(0.0, 1.0))
    }

    pub fn pick_uniform<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.inner.gen_range(0..items.len());
        items.get(idx)
    }

    /// Roulette-wheel pick weighted by `weight_of`. Falls back to the highest-weighted
    /// item if every weight is zero (spec.md §9: "fall back to the top-ranked ... rather
    /// than erroring").
    pub fn weighted_pick<'a, T>(
        &mut self,
        items: &'a [T],
        weight_of: impl Fn(&T) -> f64,
    ) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let total: f64 = items.iter().map(&weight_of).sum();
        if total <= 0.0 {
            return items.iter().max_by(|a, b| {
                weight_of(a)
                    .partial_cmp(&weight_of(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        let mut draw = self.uniform(0.0, total);
        for item in items {
            let w = weight_of(item);
            if draw < w {
                return Some(item);
            }
            draw -= w;
        }
        items.last()
    }

    /// Multiplicative jitter in `[1.0 - spread, 1.0 + spread]`.
    pub fn jitter(&mut self, spread: f64) -> f64 {
        1.0 + self.uniform(-spread, spread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_is_reproducible() {
        let mut a = SimRng::from_seed(42);
        let mut b = SimRng::from_seed(42);
        for _ in 0..10 {
            assert_eq!(a.uniform(0.0, 100.0), b.uniform(0.0, 100.0));
        }
    }

    #[test]
    fn weighted_pick_falls_back_to_top_on_zero_sum() {
        let mut rng = SimRng::from_seed(1);
        let items = vec![("low", 0.0), ("high", 0.0)];
        // Zero weights: deterministic fallback, not a panic or None.
        let picked = rng.weighted_pick(&items, |(_, w)| *w);
        assert!(picked.is_some());
    }

    #[test]
    fn weighted_pick_empty_is_none() {
        let mut rng = SimRng::from_seed(1);
        let items: Vec<(&str, f64)> = vec![];
        assert!(rng.weighted_pick(&items, |(_, w)| *w).is_none());
    }
}
