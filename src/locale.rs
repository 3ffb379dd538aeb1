//! Indonesian/international number handling and Rupiah display forms.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CURRENCY_WORDS: Regex = Regex::new(r"(?i)rupiah|idr|rp").unwrap();
}

/// Month names (lowercase) in both supported languages, full and abbreviated.
pub const MONTH_NAMES: &[(&str, u32)] = &[
    ("januari", 1), ("january", 1), ("jan", 1),
    ("februari", 2), ("february", 2), ("feb", 2),
    ("maret", 3), ("march", 3), ("mar", 3),
    ("april", 4), ("apr", 4),
    ("mei", 5), ("may", 5),
    ("juni", 6), ("june", 6), ("jun", 6),
    ("juli", 7), ("july", 7), ("jul", 7),
    ("agustus", 8), ("august", 8), ("agt", 8), ("agu", 8), ("aug", 8),
    ("september", 9), ("sept", 9), ("sep", 9),
    ("oktober", 10), ("october", 10), ("okt", 10), ("oct", 10),
    ("november", 11), ("nov", 11),
    ("desember", 12), ("december", 12), ("des", 12), ("dec", 12),
];

const INDONESIAN_MONTHS: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni",
    "Juli", "Agustus", "September", "Oktober", "November", "Desember",
];

/// Month number for a (case-insensitive) month name, trailing dot allowed.
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.trim().trim_end_matches('.').to_lowercase();
    MONTH_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, m)| m)
}

pub fn indonesian_month(month: u32) -> &'static str {
    INDONESIAN_MONTHS
        .get(month.wrapping_sub(1) as usize)
        .copied()
        .unwrap_or("")
}

/// Parse a localized amount ("Rp 150.000", "1,250,000", "1.000,50") into whole Rupiah.
///
/// A lone separator kind is always a thousands separator; with both present the
/// later one is the decimal point. Returns 0 when nothing numeric remains.
pub fn parse_amount(text: &str) -> i64 {
    let stripped = CURRENCY_WORDS.replace_all(text, "");
    let cleaned: String = stripped
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    // "150.000,-" style trailing dash
    let cleaned = cleaned.trim_end_matches(&['-', ',', '.'][..]);

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');
    let normalized = match (last_dot, last_comma) {
        (Some(_), None) => cleaned.replace('.', ""),
        (None, Some(_)) => cleaned.replace(',', ""),
        (Some(d), Some(c)) if d > c => cleaned.replace(',', ""),
        (Some(_), Some(_)) => cleaned.replace('.', "").replace(',', "."),
        (None, None) => cleaned.to_string(),
    };

    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() => v.round() as i64,
        _ => 0,
    }
}

/// Dot-grouped thousands, the way amounts are printed on local receipts.
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Compact display used in participant-facing messages: "Rp 150 ribu", "Rp 1.5 juta".
pub fn format_rupiah_short(amount: i64) -> String {
    if amount >= 1_000_000 {
        if amount % 1_000_000 == 0 {
            return format!("Rp {} juta", amount / 1_000_000);
        }
        let tenths = (amount + 50_000) / 100_000;
        return format!("Rp {}.{} juta", tenths / 10, tenths % 10);
    }
    if amount >= 1_000 {
        return format!("Rp {} ribu", (amount + 500) / 1_000);
    }
    format!("Rp {}", format_thousands(amount))
}
