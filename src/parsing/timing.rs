//! Clock-string parsing and split derivation shared by the parsers.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::types::{Seconds, DNF_SECONDS};

static HMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+):(\d{2}):(\d{2})").expect("valid clock regex"));
static MS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+):(\d{2})").expect("valid clock regex"));

fn number(caps: &regex::Captures<'_>, i: usize) -> Option<Seconds> {
    caps.get(i)?.as_str().parse().ok()
}

fn hms_from(caps: &regex::Captures<'_>) -> Option<Seconds> {
    let (h, m, s) = (number(caps, 1)?, number(caps, 2)?, number(caps, 3)?);
    if m >= 60 || s >= 60 {
        return None;
    }
    h.checked_mul(3600)?.checked_add(m * 60 + s)
}

fn ms_from(caps: &regex::Captures<'_>) -> Option<Seconds> {
    let (m, s) = (number(caps, 1)?, number(caps, 2)?);
    if s >= 60 {
        return None;
    }
    m.checked_mul(60)?.checked_add(s)
}

/// Parse a complete `H:MM:SS` string
#[must_use]
pub fn parse_hms(s: &str) -> Option<Seconds> {
    let s = s.trim();
    let caps = HMS.captures(s)?;
    if caps.get(0)?.as_str().len() != s.len() {
        return None;
    }
    hms_from(&caps)
}

/// Parse a complete `M:SS` string (minutes may exceed 59)
#[must_use]
pub fn parse_ms(s: &str) -> Option<Seconds> {
    let s = s.trim();
    let caps = MS.captures(s)?;
    if caps.get(0)?.as_str().len() != s.len() {
        return None;
    }
    ms_from(&caps)
}

/// First `H:MM:SS` time anywhere in `text`
#[must_use]
pub fn find_hms(text: &str) -> Option<Seconds> {
    HMS.captures(text).and_then(|caps| hms_from(&caps))
}

/// First clock time in `text`, preferring `H:MM:SS` over `M:SS`
#[must_use]
pub fn find_clock(text: &str) -> Option<Seconds> {
    find_hms(text).or_else(|| MS.captures(text).and_then(|caps| ms_from(&caps)))
}

/// Turn elapsed punch times into leg times.
///
/// A leg has a time only when both of its punches are known and the clock
/// moved strictly forward between them.
#[must_use]
pub fn punch_deltas(punches: &[Option<Seconds>]) -> Vec<Option<Seconds>> {
    punches
        .windows(2)
        .map(|w| match (w[0], w[1]) {
            (Some(a), Some(b)) if b > a => Some(b - a),
            _ => None,
        })
        .collect()
}

/// Append the finish leg to a list of split durations.
///
/// A split that is zero or not shorter than the whole result is a clock
/// error. The finish leg is `result - sum(splits)` and is only known when
/// the runner finished and every earlier split is known.
#[must_use]
pub fn close_with_result(splits: &[Seconds], result: Seconds) -> Vec<Option<Seconds>> {
    let mut legs: Vec<Option<Seconds>> = splits
        .iter()
        .map(|&s| Some(s).filter(|&s| s > 0 && s < result))
        .collect();

    let finish = if result >= DNF_SECONDS || legs.iter().any(Option::is_none) {
        None
    } else {
        let elapsed: u64 = splits.iter().map(|&s| u64::from(s)).sum();
        u64::from(result)
            .checked_sub(elapsed)
            .filter(|&rest| rest > 0)
            .and_then(|rest| Seconds::try_from(rest).ok())
    };
    legs.push(finish);
    legs
}

/// Round milliseconds to whole seconds; negative input has no duration
#[must_use]
pub fn millis_to_seconds(ms: i64) -> Option<Seconds> {
    if ms < 0 {
        return None;
    }
    Seconds::try_from((ms + 500) / 1000).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hms() {
        assert_eq!(parse_hms("1:02:03"), Some(3723));
        assert_eq!(parse_hms(" 00:45:10 "), Some(2710));
        assert_eq!(parse_hms("100:00:00"), Some(DNF_SECONDS));
        assert_eq!(parse_hms("1:62:03"), None);
        assert_eq!(parse_hms("12:34"), None);
        assert_eq!(parse_hms("x1:02:03"), None);
    }

    #[test]
    fn test_parse_ms() {
        assert_eq!(parse_ms("12:34"), Some(754));
        assert_eq!(parse_ms("75:00"), Some(4500));
        assert_eq!(parse_ms("1:60"), None);
        assert_eq!(parse_ms("1:02:03"), None);
    }

    #[test]
    fn test_find_clock_prefers_hms() {
        assert_eq!(find_clock("[31] 1:05:20 0:45"), Some(3920));
        assert_eq!(find_clock("[31] 12:10"), Some(730));
        assert_eq!(find_clock("-----"), None);
    }

    #[test]
    fn test_punch_deltas() {
        let punches = [Some(0), Some(100), Some(300), Some(250), Some(400)];
        assert_eq!(
            punch_deltas(&punches),
            vec![Some(100), Some(200), None, Some(150)]
        );
    }

    #[test]
    fn test_punch_deltas_around_missing_punch() {
        let punches = [Some(0), Some(100), None, Some(450)];
        assert_eq!(punch_deltas(&punches), vec![Some(100), None, None]);
    }

    #[test]
    fn test_close_with_result() {
        assert_eq!(
            close_with_result(&[100, 200], 450),
            vec![Some(100), Some(200), Some(150)]
        );
    }

    #[test]
    fn test_close_with_result_bad_split_poisons_finish() {
        assert_eq!(
            close_with_result(&[100, 500], 450),
            vec![Some(100), None, None]
        );
        assert_eq!(close_with_result(&[0, 100], 450), vec![None, Some(100), None]);
    }

    #[test]
    fn test_close_with_result_dnf() {
        assert_eq!(
            close_with_result(&[100, 200], DNF_SECONDS),
            vec![Some(100), Some(200), None]
        );
    }

    #[test]
    fn test_close_with_result_overrun() {
        // Splits adding up to the result leave no time for the finish leg
        assert_eq!(
            close_with_result(&[200, 250], 450),
            vec![Some(200), Some(250), None]
        );
    }

    #[test]
    fn test_millis_to_seconds() {
        assert_eq!(millis_to_seconds(61_499), Some(61));
        assert_eq!(millis_to_seconds(61_500), Some(62));
        assert_eq!(millis_to_seconds(-1), None);
    }
}
