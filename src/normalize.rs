//! Clean-up of raw OCR transcripts before field extraction.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// Symbols that are almost always OCR garbage on a receipt.
const NOISE: &[char] = &[
    '~', '`', '^', '*', '_', '{', '}', '[', ']', '<', '>', '"', '«', '»', '©', '®', '°', '•',
    '¦', '\\',
];

lazy_static! {
    /// Known misreads of receipt keywords, keyed by the lowercase misread.
    static ref KEYWORD_FIXES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("tota1", "total");
        m.insert("totai", "total");
        m.insert("tota!", "total");
        m.insert("tota|", "total");
        m.insert("t0tal", "total");
        m.insert("t0ta1", "total");
        m.insert("jum1ah", "jumlah");
        m.insert("jumiah", "jumlah");
        m.insert("payrnent", "payment");
        m.insert("paymen1", "payment");
        m.insert("tuna1", "tunai");
        m.insert("d1skon", "diskon");
        m.insert("diskan", "diskon");
        m.insert("kemba1i", "kembali");
        m.insert("bayer", "bayar");
        m.insert("8ayar", "bayar");
        m
    };

    static ref WORD: Regex = Regex::new(r"[A-Za-z0-9!|]+").unwrap();
    static ref HSPACE: Regex = Regex::new(r"[ \t\u{00A0}\x0B\x0C]+").unwrap();
    static ref MANY_NEWLINES: Regex = Regex::new(r"\n{3,}").unwrap();
    /// Runs made only of digits, digit look-alikes and number punctuation.
    static ref NUMERIC_RUN: Regex = Regex::new(r"[0-9OoQlIiZzSsGbBgq|!.,/\-]+").unwrap();
}

/// Map digit look-alikes to digits, but only if `segment` already holds a digit.
pub fn fix_digits(segment: &str) -> String {
    if !segment.chars().any(|c| c.is_ascii_digit()) {
        return segment.to_string();
    }
    segment
        .chars()
        .map(|c| match c {
            'O' | 'o' | 'Q' => '0',
            'l' | 'I' | 'i' | '|' | '!' => '1',
            'Z' | 'z' => '2',
            'S' | 's' => '5',
            'G' | 'b' => '6',
            'B' => '8',
            'g' | 'q' => '9',
            _ => c,
        })
        .collect()
}

/// Clean a raw transcript: noise symbols, keyword misreads, whitespace, then digit runs.
pub fn normalize(text: &str) -> String {
    let denoised: String = text
        .replace("\r\n", "\n")
        .chars()
        .map(|c| if NOISE.contains(&c) { ' ' } else { c })
        .collect();

    let repaired = WORD.replace_all(&denoised, |caps: &regex::Captures| {
        let word = &caps[0];
        match KEYWORD_FIXES.get(word.to_lowercase().as_str()) {
            Some(canonical) => match_case(word, canonical),
            None => word.to_string(),
        }
    });

    let spaced = HSPACE.replace_all(&repaired, " ");
    let spaced = MANY_NEWLINES.replace_all(&spaced, "\n\n");

    fix_numeric_runs(&spaced)
}

fn fix_numeric_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in NUMERIC_RUN.find_iter(text) {
        out.push_str(&text[last..m.start()]);
        if is_free_standing(text, m.start(), m.end()) {
            out.push_str(&fix_digits(m.as_str()));
        } else {
            out.push_str(m.as_str());
        }
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

/// A run counts as a number only if it is not glued to surrounding letters.
/// A directly preceding currency prefix ("Rp", "IDR") is allowed.
fn is_free_standing(text: &str, start: usize, end: usize) -> bool {
    let before = &text[..start];
    let glued_before = before
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric());
    if glued_before {
        let tail_start = before.char_indices().rev().nth(2).map_or(0, |(i, _)| i);
        let tail = before[tail_start..].to_lowercase();
        if !(tail.ends_with("rp") || tail.ends_with("idr")) {
            return false;
        }
    }
    !text[end..].chars().next().is_some_and(|c| c.is_alphanumeric())
}

fn match_case(original: &str, canonical: &str) -> String {
    let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return canonical.to_uppercase();
    }
    if original.chars().next().is_some_and(|c| c.is_uppercase()) {
        let mut chars = canonical.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }
    canonical.to_string()
}
