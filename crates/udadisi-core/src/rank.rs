//! Deterministic key ordering for count maps.
//!
//! `HashMap` iteration order differs between runs, so every count map is
//! passed through [`rank_by_key`] before it reaches a caller.

/// Orders `(key, count)` pairs by key, ascending lexicographic.
///
/// Keys are expected to be unique; the input is usually a `HashMap`.
pub fn rank_by_key<I>(counts: I) -> Vec<(String, i64)>
where
    I: IntoIterator<Item = (String, i64)>,
{
    let mut ranked: Vec<(String, i64)> = counts.into_iter().collect();
    ranked.sort_unstable_by(|a, b| a.0.cmp(&b.0));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample() -> HashMap<String, i64> {
        [("water", 8), ("gps", 4), ("satellite", 1), ("drought", 3)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn sorts_ascending_by_key() {
        let ranked = rank_by_key(sample());
        let keys: Vec<&str> = ranked.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["drought", "gps", "satellite", "water"]);
        assert_eq!(ranked[1], ("gps".to_string(), 4));
    }

    #[test]
    fn equivalent_maps_rank_identically() {
        let a = rank_by_key(sample());
        let mut pairs: Vec<(String, i64)> = sample().into_iter().collect();
        pairs.reverse();
        let rebuilt: HashMap<String, i64> = pairs.into_iter().collect();
        assert_eq!(a, rank_by_key(rebuilt));
    }

    #[test]
    fn reranking_is_a_no_op() {
        let once = rank_by_key(sample());
        let twice = rank_by_key(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_input() {
        assert!(rank_by_key(HashMap::new()).is_empty());
    }
}
