//! Seed budget reduction
//!
//! The recommendation engine accepts at most [`MAX_TOTAL_SEEDS`] seeds across
//! genres, tracks and artists combined. While over budget, one random seed is
//! removed from the currently largest category (ties go to genres, then
//! tracks, then artists). Inputs already within budget are returned unchanged.

use crate::models::{CandidateParameters, SeedCategory, SeedSet, MAX_TOTAL_SEEDS};
use rand::Rng;
use tracing::debug;

/// Reduce a candidate's seeds to the budget
pub fn reduce<R: Rng + ?Sized>(mut candidate: CandidateParameters, rng: &mut R) -> CandidateParameters {
    reduce_seeds(&mut candidate.seeds, rng);
    candidate
}

/// Reduce a seed set in place, returning the removed seeds in removal order
pub fn reduce_seeds<R: Rng + ?Sized>(seeds: &mut SeedSet, rng: &mut R) -> Vec<String> {
    let mut removed = Vec::new();

    while seeds.total() > MAX_TOTAL_SEEDS {
        let Some(category) = largest_category(seeds) else {
            break;
        };
        let index = rng.gen_range(0..seeds.count(category));
        if let Some(value) = seeds.remove_at(category, index) {
            debug!(category = category.key(), seed = %value, "Dropped seed over budget");
            removed.push(value);
        }
    }

    removed
}

/// Category with the most seeds; the first in genres → tracks → artists wins ties
fn largest_category(seeds: &SeedSet) -> Option<SeedCategory> {
    let mut largest: Option<(SeedCategory, usize)> = None;

    for category in SeedCategory::ALL {
        let count = seeds.count(category);
        if count > 0 && largest.map_or(true, |(_, best)| count > best) {
            largest = Some((category, count));
        }
    }

    largest.map(|(category, _)| category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    fn seed_set(genres: usize, tracks: usize, artists: usize) -> SeedSet {
        let mut seeds = SeedSet::new();
        seeds.insert(SeedCategory::Genres, names("g", genres));
        seeds.insert(SeedCategory::Tracks, names("t", tracks));
        seeds.insert(SeedCategory::Artists, names("a", artists));
        seeds
    }

    #[test]
    fn test_within_budget_is_unchanged() {
        let mut rng = StdRng::seed_from_u64(1);
        for (g, t, a) in [(5, 0, 0), (2, 2, 1), (0, 0, 1), (1, 1, 1)] {
            let original = seed_set(g, t, a);
            let mut seeds = original.clone();
            let removed = reduce_seeds(&mut seeds, &mut rng);
            assert!(removed.is_empty());
            assert_eq!(seeds, original);
        }
    }

    #[test]
    fn test_over_budget_lands_within_one_to_five() {
        for seed in 0..50u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            for (g, t, a) in [(6, 0, 0), (3, 3, 0), (5, 5, 5), (1, 9, 2), (0, 0, 7)] {
                let mut seeds = seed_set(g, t, a);
                reduce_seeds(&mut seeds, &mut rng);

                assert!((1..=MAX_TOTAL_SEEDS).contains(&seeds.total()));
                for (category, values) in seeds.iter() {
                    assert!(!values.is_empty(), "{} left present but empty", category.key());
                }
            }
        }
    }

    #[test]
    fn test_largest_first_with_tie_break() {
        let mut rng = StdRng::seed_from_u64(7);

        // 3/3/0: tie between genres and tracks goes to genres
        let mut seeds = seed_set(3, 3, 0);
        reduce_seeds(&mut seeds, &mut rng);
        assert_eq!(
            (seeds.count(SeedCategory::Genres), seeds.count(SeedCategory::Tracks)),
            (2, 3)
        );

        // 4/4/4 trims round-robin in evaluation order down to 1/2/2
        let mut seeds = seed_set(4, 4, 4);
        reduce_seeds(&mut seeds, &mut rng);
        assert_eq!(
            (
                seeds.count(SeedCategory::Genres),
                seeds.count(SeedCategory::Tracks),
                seeds.count(SeedCategory::Artists)
            ),
            (1, 2, 2)
        );

        // A single oversized category absorbs every removal
        let mut seeds = seed_set(1, 6, 0);
        let removed = reduce_seeds(&mut seeds, &mut rng);
        assert_eq!(removed.len(), 2);
        assert!(removed.iter().all(|r| r.starts_with('t')));
        assert_eq!(seeds.count(SeedCategory::Genres), 1);
        assert_eq!(seeds.count(SeedCategory::Tracks), 4);
    }

    #[test]
    fn test_same_rng_seed_is_deterministic() {
        let run = || {
            let mut rng = StdRng::seed_from_u64(99);
            let mut seeds = seed_set(5, 4, 3);
            reduce_seeds(&mut seeds, &mut rng);
            seeds
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_reduce_keeps_other_fields() {
        let mut rng = StdRng::seed_from_u64(3);
        let candidate = CandidateParameters {
            seeds: seed_set(8, 0, 0),
            target_valence: Some(0.5),
            limit: Some(10.into()),
            ..Default::default()
        };

        let reduced = reduce(candidate, &mut rng);
        assert_eq!(reduced.seeds.total(), 5);
        assert_eq!(reduced.target_valence, Some(0.5));
        assert_eq!(reduced.limit, Some(10.into()));
    }
}
