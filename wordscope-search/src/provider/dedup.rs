//! Hit deduplication by text and stable score ranking.
//!
//! Hits sharing the same `text` are merged: the highest-scored entry is
//! kept, at the position where that text first appeared. Sorting is
//! stable, so ties keep arrival order.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::Hit;

/// Deduplicate hits by `text`, keeping the max score.
///
/// The output keeps first-arrival order of each distinct text.
pub fn deduplicate(hits: impl IntoIterator<Item = Hit>) -> Vec<Hit> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Hit> = Vec::new();

    for hit in hits {
        match positions.get(hit.text()) {
            Some(&index) => {
                if hit.score() > unique[index].score() {
                    unique[index] = hit;
                }
            }
            None => {
                positions.insert(hit.text().to_string(), unique.len());
                unique.push(hit);
            }
        }
    }

    unique
}

/// Stable sort by score, descending.
pub fn sort_by_score(hits: &mut [Hit]) {
    hits.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap_or(Ordering::Equal));
}

/// Deduplicate, then sort descending.
pub fn rank(hits: impl IntoIterator<Item = Hit>) -> Vec<Hit> {
    let mut ranked = deduplicate(hits);
    sort_by_score(&mut ranked);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(hits: &[Hit]) -> Vec<&str> {
        hits.iter().map(Hit::text).collect()
    }

    #[test]
    fn unique_texts_pass_through() {
        let deduped = deduplicate(vec![Hit::new(0.3, "apple"), Hit::new(0.9, "pear")]);
        assert_eq!(texts(&deduped), ["apple", "pear"]);
    }

    #[test]
    fn highest_score_kept() {
        let deduped = deduplicate(vec![
            Hit::new(0.2, "apple").with_help("Autocomplete (0.2000)"),
            Hit::new(0.8, "apple").with_help("Sounds-like (0.8000)"),
        ]);
        assert_eq!(deduped.len(), 1);
        assert!((deduped[0].score() - 0.8).abs() < f64::EPSILON);
        assert_eq!(deduped[0].help(), Some("Sounds-like (0.8000)"));
    }

    #[test]
    fn lower_duplicate_does_not_replace() {
        let deduped = deduplicate(vec![
            Hit::new(0.8, "apple").with_help("first"),
            Hit::new(0.8, "apple").with_help("second"),
            Hit::new(0.1, "apple").with_help("third"),
        ]);
        assert_eq!(deduped[0].help(), Some("first"));
    }

    #[test]
    fn merged_entry_keeps_first_position() {
        let deduped = deduplicate(vec![
            Hit::new(0.1, "apple"),
            Hit::new(0.5, "pear"),
            Hit::new(0.9, "apple"),
        ]);
        assert_eq!(texts(&deduped), ["apple", "pear"]);
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let mut hits = vec![
            Hit::new(0.5, "b"),
            Hit::new(0.9, "a"),
            Hit::new(0.5, "c"),
            Hit::new(0.1, "d"),
        ];
        sort_by_score(&mut hits);
        assert_eq!(texts(&hits), ["a", "b", "c", "d"]);
    }

    #[test]
    fn rank_merges_and_orders() {
        let ranked = rank(vec![
            Hit::new(1.0, "apple"),
            Hit::new(0.0, "apples"),
            Hit::new(0.0, "apple"),
            Hit::new(0.4, "applet"),
        ]);
        assert_eq!(texts(&ranked), ["apple", "applet", "apples"]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(rank(Vec::new()).is_empty());
    }
}
