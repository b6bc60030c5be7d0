use std::num::ParseIntError;

use tracing::warn;

/// Best-effort lower bound of a free-text headcount ("100-500", "1,000+ employees").
/// Unparseable input logs a warning and yields 0.
pub fn parse_employee_count(raw: &str) -> u64 {
    match try_parse_employee_count(raw) {
        Ok(n) => n,
        Err(e) => {
            warn!("Error parsing employee count '{}': {}", raw, e);
            0
        }
    }
}

/// Like [`parse_employee_count`] but hands the failure back to the caller.
pub fn try_parse_employee_count(raw: &str) -> Result<u64, ParseIntError> {
    let s = raw.to_lowercase().replace("employees", "");
    let s = s.trim();

    let digits = if let Some((lower, _)) = s.split_once('-') {
        lower.replace(',', "")
    } else if s.contains('+') {
        s.replace(['+', ','], "")
    } else {
        s.replace(',', "")
    };

    digits.trim().parse::<u64>()
}
