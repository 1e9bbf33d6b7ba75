use chrono::TimeDelta;
use regex::Regex;
use std::sync::OnceLock;

const GROUP: &str = r"(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|μs|ms|s|m|h)";

fn unit_nanos(unit: &str) -> Option<f64> {
    let nanos = match unit {
        "ns" => 1.0,
        "us" | "µs" | "μs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60.0 * 1e9,
        "h" => 3600.0 * 1e9,
        _ => return None,
    };
    Some(nanos)
}

/// Parses a duration string such as `24h`, `1h30m`, `1.5h` or `-300ms`.
///
/// A bare `0` (optionally signed) is accepted; anything else needs a unit on
/// every number. Returns `None` for malformed input or values that do not fit
/// in a signed 64-bit nanosecond count.
#[must_use]
pub fn parse_duration(input: &str) -> Option<TimeDelta> {
    static FULL: OnceLock<Regex> = OnceLock::new();
    static PART: OnceLock<Regex> = OnceLock::new();
    let full = FULL.get_or_init(|| Regex::new(&format!("^(?:{GROUP})+$")).expect("Invalid regex"));
    let part = PART.get_or_init(|| Regex::new(GROUP).expect("Invalid regex"));

    let s = input.trim();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    if rest == "0" {
        return Some(TimeDelta::zero());
    }
    if !full.is_match(rest) {
        return None;
    }

    let mut total = 0.0_f64;
    for caps in part.captures_iter(rest) {
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        total += value * unit_nanos(caps.get(2)?.as_str())?;
    }

    #[allow(clippy::cast_precision_loss)]
    if total > i64::MAX as f64 {
        return None;
    }

    #[allow(clippy::cast_possible_truncation)]
    let nanos = total.round() as i64;
    Some(TimeDelta::nanoseconds(if negative { -nanos } else { nanos }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_duration("24h"), Some(TimeDelta::hours(24)));
        assert_eq!(parse_duration("15m"), Some(TimeDelta::minutes(15)));
        assert_eq!(parse_duration("30s"), Some(TimeDelta::seconds(30)));
        assert_eq!(parse_duration("500ms"), Some(TimeDelta::milliseconds(500)));
        assert_eq!(parse_duration("10us"), Some(TimeDelta::microseconds(10)));
        assert_eq!(parse_duration("10µs"), Some(TimeDelta::microseconds(10)));
        assert_eq!(parse_duration("7ns"), Some(TimeDelta::nanoseconds(7)));
    }

    #[test]
    fn test_parse_compound_and_fractional() {
        assert_eq!(parse_duration("1h30m"), Some(TimeDelta::minutes(90)));
        assert_eq!(parse_duration("1m5s"), Some(TimeDelta::seconds(65)));
        assert_eq!(parse_duration("1.5h"), Some(TimeDelta::minutes(90)));
        assert_eq!(parse_duration(".5s"), Some(TimeDelta::milliseconds(500)));
        assert_eq!(parse_duration("2h45m0.5s").map(|d| d.num_milliseconds()), Some(9_900_500));
    }

    #[test]
    fn test_parse_sign_and_zero() {
        assert_eq!(parse_duration("0"), Some(TimeDelta::zero()));
        assert_eq!(parse_duration("-0"), Some(TimeDelta::zero()));
        assert_eq!(parse_duration("-1h"), Some(TimeDelta::hours(-1)));
        assert_eq!(parse_duration("+2m"), Some(TimeDelta::minutes(2)));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("24"), None);
        assert_eq!(parse_duration("h"), None);
        assert_eq!(parse_duration("1d"), None);
        assert_eq!(parse_duration("1h 30m"), None);
        assert_eq!(parse_duration("one hour"), None);
        assert_eq!(parse_duration("-"), None);
        assert_eq!(parse_duration("99999999999h"), None);
    }
}
