//! ISO-8601 duration parsing.
//!
//! The Data API reports durations like `PT1H23M45S`. Only the day/time
//! designators YouTube actually emits are supported; anything else parses to
//! `None` and callers fall back to zero.

/// Parse an ISO-8601 duration into whole seconds.
pub fn parse_iso8601_duration(input: &str) -> Option<i64> {
    let rest = input.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, t),
        None => (rest, ""),
    };

    let mut seconds: i64 = 0;

    for (value, unit) in components(date_part)? {
        match unit {
            'D' => seconds += value * 86_400,
            _ => return None,
        }
    }
    for (value, unit) in components(time_part)? {
        match unit {
            'H' => seconds += value * 3_600,
            'M' => seconds += value * 60,
            'S' => seconds += value,
            _ => return None,
        }
    }

    Some(seconds)
}

/// Split `1H23M45S` into `(value, unit)` pairs; empty input yields none.
fn components(part: &str) -> Option<Vec<(i64, char)>> {
    let mut out = Vec::new();
    let mut digits = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if c.is_ascii_alphabetic() {
            if digits.is_empty() {
                return None;
            }
            out.push((digits.parse().ok()?, c));
            digits.clear();
        } else {
            return None;
        }
    }
    if !digits.is_empty() {
        return None; // trailing number without a unit
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_youtube_durations() {
        assert_eq!(parse_iso8601_duration("PT0S"), Some(0));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("PT3M21S"), Some(201));
        assert_eq!(parse_iso8601_duration("PT1H23M45S"), Some(5025));
        assert_eq!(parse_iso8601_duration("PT2H"), Some(7200));
        assert_eq!(parse_iso8601_duration("P1DT2H"), Some(93_600));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse_iso8601_duration(""), None);
        assert_eq!(parse_iso8601_duration("1H"), None);
        assert_eq!(parse_iso8601_duration("PT"), Some(0));
        assert_eq!(parse_iso8601_duration("PTXS"), None);
        assert_eq!(parse_iso8601_duration("PT5"), None);
        assert_eq!(parse_iso8601_duration("P3W"), None);
    }
}
