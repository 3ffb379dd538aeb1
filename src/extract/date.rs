use super::{DATE_MONTH_NAME, DATE_NUMERIC};

/// How far either side of a numeric date to look for stray digits.
const ADJACENT_WINDOW: usize = 5;

/// Find the transaction date. Month-name forms win over purely numeric ones.
/// Returns the matched substring verbatim.
pub fn extract_date(text: &str) -> Option<String> {
    month_name_date(text).or_else(|| numeric_date(text))
}

fn month_name_date(text: &str) -> Option<String> {
    for caps in DATE_MONTH_NAME.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let day: u32 = caps[1].parse().unwrap_or(0);
        if !(1..=31).contains(&day) {
            continue;
        }
        // "20 Dec 19:45": the "year" is really the hour of the clock that follows.
        let end = match (caps.get(2), caps.get(3)) {
            (Some(month), Some(year)) if year.len() == 2 && starts_clock(&text[year.end()..]) => {
                month.end()
            }
            _ => whole.end(),
        };
        return Some(text[whole.start()..end].to_string());
    }
    None
}

fn starts_clock(rest: &str) -> bool {
    let mut chars = rest.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(':' | '.'), Some(d)) if d.is_ascii_digit()
    )
}

fn numeric_date(text: &str) -> Option<String> {
    for (order, pattern) in DATE_NUMERIC.iter() {
        for caps in pattern.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            if has_adjacent_digits(text, whole.start(), whole.end()) {
                tracing::debug!(candidate = whole.as_str(), "date-shaped run inside an id, skipped");
                continue;
            }
            let parts: Vec<u32> = (1..=3)
                .map(|i| caps[i].parse().unwrap_or(0))
                .collect();
            if plausible(parts[0], parts[1], parts[2]) {
                tracing::debug!(?order, date = whole.as_str(), "numeric date");
                return Some(whole.as_str().to_string());
            }
        }
    }
    None
}

/// Day/month in front, or a 2020–2030 year/month/day triple.
fn plausible(a: u32, b: u32, c: u32) -> bool {
    let day_month = (1..=31).contains(&a) && (1..=12).contains(&b);
    let year_month_day =
        (2020..=2030).contains(&a) && (1..=12).contains(&b) && (1..=31).contains(&c);
    day_month || year_month_day
}

/// True when a digit sits within a few characters of the match without a
/// whitespace break, as in "TRX-0020/12/2025" style reference numbers.
fn has_adjacent_digits(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start]
        .chars()
        .rev()
        .take(ADJACENT_WINDOW)
        .take_while(|c| !c.is_whitespace())
        .any(|c| c.is_ascii_digit());
    let after = text[end..]
        .chars()
        .take(ADJACENT_WINDOW)
        .take_while(|c| !c.is_whitespace())
        .any(|c| c.is_ascii_digit());
    before || after
}
