use super::TIME;

/// First clock reading with a valid hour (0–23) and minute, verbatim.
pub fn extract_time(text: &str) -> Option<String> {
    for pattern in TIME.iter() {
        for caps in pattern.captures_iter(text) {
            let hour: u32 = caps[1].parse().unwrap_or(99);
            let minute: u32 = caps[2].parse().unwrap_or(99);
            if hour <= 23 && minute <= 59 {
                return caps.get(0).map(|m| m.as_str().trim().to_string());
            }
        }
    }
    None
}
