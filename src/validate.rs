//! Mission rules: event date, earliest transaction time, minimum spend.

use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::config::{CampaignConfig, MissionRequirement};
use crate::error::{ReceiptError, Result};
use crate::extract::{NumericDateOrder, DATE_MONTH_NAME, DATE_NUMERIC};
use crate::locale::{format_rupiah_short, indonesian_month, month_number};
use crate::receipt::ExtractedReceiptData;

lazy_static! {
    static ref CLOCK: Regex =
        Regex::new(r"(?i)(\d{1,2})[:.](\d{2})(?::\d{2})?(?:[ \t]*([ap])\.?[ \t]?m\b)?").unwrap();
    static ref TOKEN: Regex = Regex::new(r"[A-Za-z]+|\d+").unwrap();
}

/// A requirement that a receipt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCheck {
    Date,
    Time,
    Amount,
}

/// Outcome of checking one receipt against one mission.
///
/// Valid exactly when there are no errors; errors are in date, time, amount order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationVerdict {
    errors: Vec<String>,
    failed_checks: Vec<RuleCheck>,
}

impl ValidationVerdict {
    fn fail(&mut self, check: RuleCheck, message: String) {
        self.failed_checks.push(check);
        self.errors.push(message);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn failed_checks(&self) -> &[RuleCheck] {
        &self.failed_checks
    }
}

impl Serialize for ValidationVerdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a> {
            is_valid: bool,
            errors: &'a [String],
            failed_checks: &'a [RuleCheck],
        }
        Wire {
            is_valid: self.is_valid(),
            errors: &self.errors,
            failed_checks: &self.failed_checks,
        }
        .serialize(serializer)
    }
}

/// Checks extracted receipt fields against a mission. The required calendar
/// date is the same for every mission.
#[derive(Debug, Clone, Copy)]
pub struct MissionValidator {
    event_date: NaiveDate,
}

impl MissionValidator {
    pub fn new(event_date: NaiveDate) -> Self {
        MissionValidator { event_date }
    }

    pub fn from_config(config: &CampaignConfig) -> Self {
        MissionValidator::new(config.event.date)
    }

    /// Run all three checks; none short-circuits the others.
    pub fn validate(
        &self,
        mission: &MissionRequirement,
        data: &ExtractedReceiptData,
    ) -> ValidationVerdict {
        let mut verdict = ValidationVerdict::default();

        if !data.date().is_some_and(|d| self.is_event_date(d)) {
            verdict.fail(
                RuleCheck::Date,
                format!(
                    "Struk harus bertanggal {} {} {}",
                    self.event_date.day(),
                    indonesian_month(self.event_date.month()),
                    self.event_date.year()
                ),
            );
        }

        let early_enough = match (data.time().and_then(clock_minutes), mission.min_time_minutes()) {
            (Some(at), Some(min)) => at >= min,
            _ => false,
        };
        if !early_enough {
            verdict.fail(
                RuleCheck::Time,
                format!("Waktu transaksi minimal {}", mission.display_min_time()),
            );
        }

        if !data.amount().is_some_and(|a| a >= mission.min_amount) {
            verdict.fail(
                RuleCheck::Amount,
                format!(
                    "Jumlah transaksi minimal {}",
                    format_rupiah_short(mission.min_amount)
                ),
            );
        }

        tracing::debug!(mission = mission.id, failed = ?verdict.failed_checks, "receipt validated");
        verdict
    }

    /// Whether `raw` names the event date.
    ///
    /// A structured date (month name, `DD/MM/YYYY`, `YYYY-MM-DD`) decides on its
    /// own. Otherwise day, month and year must appear as three consecutive tokens.
    pub fn is_event_date(&self, raw: &str) -> bool {
        let event = (self.event_date.day(), self.event_date.month(), self.event_date.year());

        if let Some(caps) = DATE_MONTH_NAME.captures(raw) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month = month_number(&caps[2]).unwrap_or(0);
            let year = match caps.get(3) {
                Some(y) if y.as_str().len() == 2 => 2000 + y.as_str().parse::<i32>().unwrap_or(0),
                Some(y) => y.as_str().parse().unwrap_or(0),
                None => event.2,
            };
            return (day, month, year) == event;
        }

        for (order, pattern) in DATE_NUMERIC.iter() {
            if let Some(caps) = pattern.captures(raw) {
                let part = |i: usize| caps[i].parse::<u32>().unwrap_or(0);
                let found = match order {
                    NumericDateOrder::DayMonthYear => (part(1), part(2), part(3) as i32),
                    NumericDateOrder::YearMonthDay => (part(3), part(2), part(1) as i32),
                };
                return found == event;
            }
        }

        self.loose_match(raw)
    }

    fn loose_match(&self, raw: &str) -> bool {
        let tokens: Vec<&str> = TOKEN.find_iter(raw).map(|m| m.as_str()).collect();
        let day = |t: &str| t.parse::<u32>().ok() == Some(self.event_date.day());
        let month = |t: &str| {
            let n = t.parse::<u32>().ok().or_else(|| month_number(t));
            n == Some(self.event_date.month())
        };
        let year = |t: &str| {
            let full = self.event_date.year().to_string();
            t == full || (t.len() == 2 && full.ends_with(t))
        };
        tokens.windows(3).any(|w| {
            (day(w[0]) && month(w[1]) && year(w[2])) || (year(w[0]) && month(w[1]) && day(w[2]))
        })
    }
}

/// Minutes since midnight for "19:45", "19.45", "07:45 PM", "Jam 19.45".
pub fn clock_minutes(raw: &str) -> Option<u32> {
    let caps = CLOCK.captures(raw)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
        Some("p") if hour < 12 => hour += 12,
        Some("a") if hour == 12 => hour = 0,
        _ => {}
    }
    (hour <= 23 && minute <= 59).then_some(hour * 60 + minute)
}

/// Validate `data` against the mission with `mission_id` in `config`.
pub fn validate_for_mission(
    config: &CampaignConfig,
    mission_id: u8,
    data: &ExtractedReceiptData,
) -> Result<ValidationVerdict> {
    let mission = config
        .mission(mission_id)
        .ok_or(ReceiptError::UnknownMission(mission_id))?;
    Ok(MissionValidator::from_config(config).validate(mission, data))
}
