use std::collections::{BTreeMap, HashSet};

use regex::Regex;

use super::{EXCLUSION, FALLBACK_TOTAL, GROUPED_NUMBER, PAYMENT};
use crate::config::AmountHeuristics;
use crate::locale::parse_amount;
use crate::receipt::is_plausible_amount;

/// Amount paid, using the default selection heuristics.
pub fn extract_amount(text: &str) -> Option<i64> {
    extract_amount_with(text, &AmountHeuristics::default())
}

/// Amount paid. Never returns a value outside the plausible range, and never
/// one that only appears next to a savings or discount keyword.
pub fn extract_amount_with(text: &str, heuristics: &AmountHeuristics) -> Option<i64> {
    extract_amount_from(&[text], heuristics)
}

/// Amount paid across several readings of the same receipt, most trusted
/// first. Each tier is tried on every reading before the next, weaker tier
/// runs, so a payment line that only reads cleanly in a later reading still
/// beats an item price in the first.
pub fn extract_amount_from(texts: &[&str], heuristics: &AmountHeuristics) -> Option<i64> {
    let excluded: HashSet<i64> = texts.iter().flat_map(|text| excluded_amounts(text)).collect();
    if !excluded.is_empty() {
        tracing::debug!(?excluded, "discount figures");
    }
    let eligible = |value: i64| is_plausible_amount(value) && !excluded.contains(&value);

    for (reading, text) in texts.iter().enumerate() {
        for (name, pattern) in PAYMENT.iter() {
            if let Some(value) = amounts(pattern, text).find(|&v| eligible(v)) {
                tracing::debug!(pattern = name, reading, value, "payment line");
                return Some(value);
            }
        }
    }

    let mut totals: Vec<i64> = texts
        .iter()
        .flat_map(|text| FALLBACK_TOTAL.iter().flat_map(move |(_, pattern)| amounts(pattern, text)))
        .filter(|&v| eligible(v))
        .collect();
    totals.sort_unstable();
    totals.dedup();
    if let Some(&first) = totals.first() {
        let value = totals
            .iter()
            .copied()
            .find(|&v| v >= heuristics.preferred_floor)
            .unwrap_or(first);
        tracing::debug!(candidates = ?totals, value, "total-shaped fallback");
        return Some(value);
    }

    if !heuristics.use_frequency_scan {
        return None;
    }
    // counting over every reading would double the weight of unchanged lines
    texts
        .iter()
        .find_map(|text| most_frequent(amounts(&GROUPED_NUMBER, text).filter(|&v| eligible(v))))
}

/// Amounts printed next to a savings or discount keyword.
pub fn excluded_amounts(text: &str) -> HashSet<i64> {
    amounts(&EXCLUSION, text).filter(|&v| v > 0).collect()
}

fn amounts<'a>(pattern: &'a Regex, text: &'a str) -> impl Iterator<Item = i64> + 'a {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.name("amount").map(|m| parse_amount(m.as_str())))
}

/// Most repeated value; ties go to the smaller one.
fn most_frequent(values: impl Iterator<Item = i64>) -> Option<i64> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    // BTreeMap iterates ascending, and max_by_key keeps the last maximum,
    // so walk it in reverse to land on the smallest value among equals.
    let (value, count) = counts.into_iter().rev().max_by_key(|&(_, count)| count)?;
    tracing::debug!(value, count, "most frequent grouped number");
    Some(value)
}
