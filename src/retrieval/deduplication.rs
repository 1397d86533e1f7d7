//! Order-preserving id deduplication

use ahash::{HashSet, HashSetExt};

/// Drop repeated ids, keeping the first occurrence
pub fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(ids.len());

    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Restrict a re-ranked list to ids that were offered, without repeats
///
/// Collaborators may invent ids or echo one twice; anything not in `offered`
/// is discarded and the first occurrence of each id wins.
pub fn sanitize_ranking(ranked: Vec<String>, offered: &[String]) -> Vec<String> {
    let allowed: HashSet<&str> = offered.iter().map(String::as_str).collect();

    dedup_ids(
        ranked
            .into_iter()
            .filter(|id| allowed.contains(id.as_str()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_dedup_keeps_first() {
        assert_eq!(dedup_ids(ids(&["b", "a", "b", "c", "a"])), ids(&["b", "a", "c"]));
    }

    #[test]
    fn test_sanitize_drops_unknown_and_repeats() {
        let offered = ids(&["c1", "c2", "c3"]);
        let ranked = ids(&["c3", "ghost", "c1", "c3"]);

        assert_eq!(sanitize_ranking(ranked, &offered), ids(&["c3", "c1"]));
    }
}
