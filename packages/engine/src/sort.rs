//! Column sorting: numeric when every non-blank value is a number, otherwise
//! plain string order.

use crate::model::SortDirection;
use std::cmp::Ordering;

/// How a column's values compare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    Numeric,
    Lexicographic,
}

/// Parse a cell as a number, ignoring thousands separators
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn classify<'a, I>(values: I) -> SortKind
where
    I: IntoIterator<Item = &'a str>,
{
    let all_numeric = values
        .into_iter()
        .filter(|value| !is_blank(value))
        .all(|value| parse_number(value).is_some());

    if all_numeric {
        SortKind::Numeric
    } else {
        SortKind::Lexicographic
    }
}

/// Stable-sort `(key, value)` pairs by value; returns the keys in order
pub fn sort_keys<K>(mut entries: Vec<(K, String)>, direction: SortDirection) -> (SortKind, Vec<K>) {
    let kind = classify(entries.iter().map(|(_, value)| value.as_str()));

    match kind {
        SortKind::Numeric => {
            entries.sort_by(|(_, a), (_, b)| compare_numeric(a, b, direction));
        }
        SortKind::Lexicographic => {
            entries.sort_by(|(_, a), (_, b)| match direction {
                SortDirection::Ascending => a.cmp(b),
                SortDirection::Descending => b.cmp(a),
            });
        }
    }

    (kind, entries.into_iter().map(|(key, _)| key).collect())
}

/// Blanks first when ascending, last when descending
fn compare_numeric(a: &str, b: &str, direction: SortDirection) -> Ordering {
    match (parse_number(a), parse_number(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => match direction {
            SortDirection::Ascending => Ordering::Less,
            SortDirection::Descending => Ordering::Greater,
        },
        (Some(_), None) => match direction {
            SortDirection::Ascending => Ordering::Greater,
            SortDirection::Descending => Ordering::Less,
        },
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(values: &[&str]) -> Vec<(usize, String)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (i, v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_number_strips_commas() {
        assert_eq!(parse_number("1,200"), Some(1200.0));
        assert_eq!(parse_number(" 3.5 "), Some(3.5));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_numeric_classification_ignores_blanks() {
        assert_eq!(classify(["10", "", "2", "  "]), SortKind::Numeric);
        assert_eq!(classify(["10", "x", "2"]), SortKind::Lexicographic);
    }

    #[test]
    fn test_numeric_sort_ascending_blanks_first() {
        let (kind, order) = sort_keys(entries(&["10", "", "9", "1,000"]), SortDirection::Ascending);
        assert_eq!(kind, SortKind::Numeric);
        assert_eq!(order, vec![1, 2, 0, 3]);
    }

    #[test]
    fn test_numeric_sort_descending_blanks_last() {
        let (_, order) = sort_keys(entries(&["10", "", "9", "1,000"]), SortDirection::Descending);
        assert_eq!(order, vec![3, 0, 2, 1]);
    }

    #[test]
    fn test_lexicographic_sort_is_plain_string_order() {
        let (kind, order) = sort_keys(entries(&["b", "10", "a", "9"]), SortDirection::Ascending);
        assert_eq!(kind, SortKind::Lexicographic);
        assert_eq!(order, vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_numeric_not_lexicographic_for_number_columns() {
        // "9" < "10" numerically even though "10" < "9" as strings
        let (_, order) = sort_keys(entries(&["10", "9"]), SortDirection::Ascending);
        assert_eq!(order, vec![1, 0]);
    }
}
