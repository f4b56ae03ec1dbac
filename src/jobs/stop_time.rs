use crate::config::CompileError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

pub const STOP_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Resolves a `stop-after` value to a UTC deadline rendered with
/// [`STOP_TIME_FORMAT`]. Relative values (`+7d`, `+1d12h`, `+2w`) are
/// anchored at `reference`.
pub fn resolve_stop_time(
    raw: &str,
    reference: Option<DateTime<Utc>>,
) -> Result<String, CompileError> {
    let value = raw.trim();
    let deadline = if let Some(relative) = value.strip_prefix('+') {
        let offset = parse_relative_offset(relative).map_err(|reason| invalid(value, reason))?;
        let reference = reference.ok_or_else(|| {
            invalid(
                value,
                "relative stop times need a reference time; pass one in the compiler options"
                    .to_string(),
            )
        })?;
        reference
            .checked_add_signed(offset)
            .ok_or_else(|| invalid(value, "relative offset is out of range".to_string()))?
    } else {
        parse_absolute(value).map_err(|reason| invalid(value, reason))?
    };
    Ok(deadline.format(STOP_TIME_FORMAT).to_string())
}

fn invalid(value: &str, reason: String) -> CompileError {
    CompileError::InvalidStopTime {
        value: value.to_string(),
        reason,
    }
}

fn parse_absolute(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(value, STOP_TIME_FORMAT) {
        return Ok(at.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(at) = date.and_hms_opt(0, 0, 0) {
            return Ok(at.and_utc());
        }
    }
    Err("expected YYYY-MM-DD, YYYY-MM-DD HH:MM:SS, RFC 3339 or a relative +NdNh offset".to_string())
}

/// Units: `w` weeks, `d` days, `h` hours, `m` minutes. Each unit at most once,
/// largest first.
fn parse_relative_offset(raw: &str) -> Result<Duration, String> {
    const UNITS: [(char, i64); 4] = [('w', 7 * 24 * 60), ('d', 24 * 60), ('h', 60), ('m', 1)];

    if raw.is_empty() {
        return Err("relative offset is empty".to_string());
    }
    let mut minutes: i64 = 0;
    let mut digits = String::new();
    let mut next_unit = 0;
    for ch in raw.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let position = UNITS[next_unit..]
            .iter()
            .position(|(unit, _)| *unit == ch)
            .ok_or_else(|| format!("unexpected unit `{ch}`; use w, d, h or m in that order"))?;
        let (_, scale) = UNITS[next_unit + position];
        next_unit += position + 1;
        if digits.is_empty() {
            return Err(format!("unit `{ch}` has no amount"));
        }
        let amount: i64 = digits
            .parse()
            .map_err(|_| format!("amount `{digits}` is out of range"))?;
        minutes = amount
            .checked_mul(scale)
            .and_then(|value| minutes.checked_add(value))
            .ok_or_else(|| "relative offset is out of range".to_string())?;
        digits.clear();
    }
    if !digits.is_empty() {
        return Err(format!("amount `{digits}` is missing a unit"));
    }
    if minutes == 0 {
        return Err("relative offset must be positive".to_string());
    }
    Duration::try_minutes(minutes).ok_or_else(|| "relative offset is out of range".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0)
            .single()
            .expect("reference time")
    }

    #[test]
    fn absolute_forms_normalize_to_utc() {
        assert_eq!(
            resolve_stop_time("2025-12-31", None).expect("date"),
            "2025-12-31 00:00:00"
        );
        assert_eq!(
            resolve_stop_time("2025-12-31 23:59:00", None).expect("datetime"),
            "2025-12-31 23:59:00"
        );
        assert_eq!(
            resolve_stop_time("2025-06-01T12:00:00+02:00", None).expect("rfc3339"),
            "2025-06-01 10:00:00"
        );
    }

    #[test]
    fn relative_offsets_use_the_reference_time() {
        assert_eq!(
            resolve_stop_time("+1d12h", Some(reference())).expect("relative"),
            "2025-03-02 20:30:00"
        );
        assert_eq!(
            resolve_stop_time("+2w", Some(reference())).expect("weeks"),
            "2025-03-15 08:30:00"
        );
    }

    #[test]
    fn malformed_values_are_rejected() {
        for raw in [
            "+",
            "+12",
            "+h",
            "+3h2d",
            "+99999999w",
            "tomorrow",
            "2025-13-01",
        ] {
            assert!(
                resolve_stop_time(raw, Some(reference())).is_err(),
                "{raw} should be rejected"
            );
        }
        let err = resolve_stop_time("+3d", None).expect_err("no reference");
        assert!(err.to_string().contains("reference time"));
    }
}
