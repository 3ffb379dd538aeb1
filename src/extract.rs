pub mod amount;
pub mod date;
pub mod time;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::AmountHeuristics;
use crate::locale::MONTH_NAMES;
use crate::normalize::normalize;
use crate::receipt::ExtractedReceiptData;

pub use amount::{extract_amount, extract_amount_from, extract_amount_with};
pub use date::extract_date;
pub use time::extract_time;

// ── Pattern groups ───────────────────────────────────────────────────────────
//
// Each group is tried in declaration order; the first entry has the highest
// priority. Amount patterns expose the number through the `amount` capture.

/// Grouped (`150.000`, `1,250,000`, optional `,00` cents) or plain 4–9 digit amount.
const AMOUNT: &str = r"(?P<amount>\d{1,3}(?:[.,]\d{3})+(?:,\d{1,2})?|\d{4,9})\b";
/// Thousands-grouped amount only; card and account numbers are never grouped this way.
const GROUPED_AMOUNT: &str = r"(?P<amount>\d{1,3}(?:[.,]\d{3})+(?:,\d{1,2})?)\b";

/// Component order of a purely numeric date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericDateOrder {
    DayMonthYear,
    YearMonthDay,
}

fn month_alternation() -> String {
    let mut names: Vec<&str> = MONTH_NAMES.iter().map(|(n, _)| *n).collect();
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    names.join("|")
}

fn amount_after(prefix: &str) -> Regex {
    Regex::new(&format!("{}{}", prefix, AMOUNT)).unwrap()
}

fn grouped_amount_after(prefix: &str) -> Regex {
    Regex::new(&format!("{}{}", prefix, GROUPED_AMOUNT)).unwrap()
}

lazy_static! {
    /// Day, month name (either language), optional 2/4-digit year: "20 Des 2025", "20-Dec-25".
    pub static ref DATE_MONTH_NAME: Regex = Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})[ \-/.]*({})\b(?:[ \-/.,']*(\d{{4}}|\d{{2}})\b)?",
        month_alternation()
    ))
    .unwrap();

    pub static ref DATE_NUMERIC: Vec<(NumericDateOrder, Regex)> = vec![
        (
            NumericDateOrder::DayMonthYear,
            Regex::new(r"\b(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{4})\b").unwrap(),
        ),
        (
            NumericDateOrder::YearMonthDay,
            Regex::new(r"\b(\d{4})[/\-.](\d{1,2})[/\-.](\d{1,2})\b").unwrap(),
        ),
    ];

    /// Prefixed clock ("Jam 19.45", "Time: 19:45") first, then a bare `HH:MM[:SS] [AM|PM]`.
    pub static ref TIME: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(?:jam|pukul|waktu|time)[ \t]*[:.]?[ \t]*(\d{1,2})[:.](\d{2})\b").unwrap(),
        Regex::new(r"(?i)\b(\d{1,2}):(\d{2})(?::(\d{2}))?\b(?:[ \t]?[ap]\.?[ \t]?m\b\.?)?").unwrap(),
    ];

    /// Savings, discounts and change: never the amount paid.
    pub static ref EXCLUSION: Regex = amount_after(
        r"(?i)\b(?:hemat|diskon|disc(?:ount)?|potongan|promo|voucher|cashback|you[ \t]*save|savings?|kembali(?:an)?|change)\b[^\d\n]{0,15}",
    );

    /// Amount-paid lines, strongest evidence first.
    pub static ref PAYMENT: Vec<(&'static str, Regex)> = vec![
        (
            "total-payment",
            amount_after(r"(?i)\b(?:total[ \t]*(?:payment|pembayaran|bayar|dibayar|paid)|jumlah[ \t]*(?:bayar|dibayar|pembayaran)|amount[ \t]*paid)\b[^\d\n]{0,12}"),
        ),
        (
            "bank",
            grouped_amount_after(r"(?i)\b(?:bca|bni|bri|mandiri|cimb(?:[ \t]*niaga)?|btn|bsi|permata|danamon|ocbc|panin|mega|maybank)\b[^\d\n:]{0,20}:[^\d\n]{0,8}"),
        ),
        (
            "payment-method",
            grouped_amount_after(r"(?i)\b(?:tunai|cash|debit|kredit|credit(?:[ \t]*card)?|card|edc|qris|go-?pay|ovo|dana|shopee[ \t]*pay|linkaja|flazz|e-?money|brizzi)\b[^\d\n:]{0,20}:[^\d\n]{0,8}"),
        ),
        (
            "total-sales",
            amount_after(r"(?i)\b(?:total[ \t]*(?:sales|penjualan|belanja|harga)|jumlah[ \t]*(?:belanja|penjualan|harga))\b[^\d\n]{0,12}"),
        ),
    ];

    /// Generic total-shaped lines used when no payment line is readable.
    pub static ref FALLBACK_TOTAL: Vec<(&'static str, Regex)> = vec![
        ("grand-total", amount_after(r"(?i)\bgrand[ \t]*total\b[^\d\n]{0,12}")),
        ("line-total", amount_after(r"(?im)^[ \t]*total\b[^\d\n]{0,12}")),
        (
            "colon",
            Regex::new(r"(?i):[ \t]*(?:(?:rp|idr)\.?[ \t]*)?(?P<amount>\d{1,3}(?:[.,]\d{3})+)\b").unwrap(),
        ),
    ];

    /// Any thousands-grouped number not glued to a preceding digit or separator.
    pub static ref GROUPED_NUMBER: Regex =
        Regex::new(r"(?:^|[^\d.,])(?P<amount>\d{1,3}(?:[.,]\d{3})+)\b").unwrap();
}

// ── Field extraction ─────────────────────────────────────────────────────────

/// Extract date, time and amount from a transcript.
///
/// The raw transcript is searched first because normalisation can erase
/// characters some patterns rely on. A date or time still missing is retried
/// on the normalised text. The amount tiers are ranked across both readings,
/// so a payment line repaired by normalisation outranks a weaker raw match.
pub fn extract_fields(raw: &str, heuristics: &AmountHeuristics) -> ExtractedReceiptData {
    let normalized = normalize(raw);
    let readings: Vec<&str> = if normalized == raw {
        vec![raw]
    } else {
        vec![raw, normalized.as_str()]
    };

    let date = readings.iter().find_map(|text| extract_date(text));
    let time = readings.iter().find_map(|text| extract_time(text));
    let amount = extract_amount_from(&readings, heuristics);

    ExtractedReceiptData::new(date, time, amount, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_receipt() {
        let text = "KOPI SENJA\n20 Dec 2025 19:45\nLatte 2 x 100.000\nTotal payment: 200.000\n";
        let data = extract_fields(text, &AmountHeuristics::default());
        assert_eq!(data.date(), Some("20 Dec 2025"));
        assert_eq!(data.time(), Some("19:45"));
        assert_eq!(data.amount(), Some(200_000));
        assert_eq!(data.confidence(), 100);
        assert_eq!(data.raw_text(), text);
    }

    #[test]
    fn missing_fields_come_from_normalized_text() {
        let text = "Tgl 2O/12/2O25\nTota1 payment: 1O0.OOO";
        let data = extract_fields(text, &AmountHeuristics::default());
        assert_eq!(data.date(), Some("20/12/2025"));
        assert_eq!(data.amount(), Some(100_000));
        assert_eq!(data.time(), None);
        assert_eq!(data.confidence(), 70);
        // the transcript is kept verbatim
        assert_eq!(data.raw_text(), text);
    }

    #[test]
    fn repaired_payment_line_beats_item_prices() {
        let heuristics = AmountHeuristics::default();
        let data = extract_fields("Kopi Susu 1 x 25.000\nTota1 payment: 1O0.OOO", &heuristics);
        assert_eq!(data.amount(), Some(100_000));
        let data = extract_fields("Tota1 payment: 1O0.OOO\nKode 12.345", &heuristics);
        assert_eq!(data.amount(), Some(100_000));
    }

    #[test]
    fn column_aligned_total_is_read_after_collapsing_spaces() {
        let text = "TOTAL              Rp 250.000\nKode 12.345";
        let data = extract_fields(text, &AmountHeuristics::default());
        assert_eq!(data.amount(), Some(250_000));
    }

    #[test]
    fn blank_text_scores_zero() {
        let data = extract_fields("", &AmountHeuristics::default());
        assert_eq!(data, ExtractedReceiptData::empty());
    }

    #[test]
    fn month_alternation_prefers_longer_names() {
        let alt = month_alternation();
        let pos = |s: &str| alt.split('|').position(|n| n == s).unwrap();
        assert!(pos("desember") < pos("des"));
        assert!(pos("september") < pos("sept"));
    }
}
