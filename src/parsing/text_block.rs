//! Parser for WinOrient text-block exports.
//!
//! Each group is an `<h2>` heading followed by a `<pre>` block with one runner
//! per line. Lines carry per-leg split durations rather than elapsed punch
//! times; the finish leg is whatever remains of the result. Four line layouts
//! exist and are told apart by the first runner line of the block.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::debug;

use crate::core::types::{Leg, Seconds, DNF_SECONDS};
use crate::parsing::html::{element_text, strip_tags, BOLD, H2, PRE};
use crate::parsing::timing::{close_with_result, parse_ms};
use crate::parsing::{ParseError, RawEvent, RawGroup, RawRunner};

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid text block regex")
}

static CLOCK_SPLIT: Lazy<Regex> = Lazy::new(|| regex(r"(\d{2}):(\d{2}):(\d{2})\("));
static SHORT_SPLIT: Lazy<Regex> = Lazy::new(|| regex(r"(\d{1,2}):(\d{2})\("));
static SPACED_SHORT_SPLIT: Lazy<Regex> = Lazy::new(|| regex(r"\s\d{1,2}:\d{2}\("));
static SMALL_MARKER: Lazy<Regex> = Lazy::new(|| regex(r"\((\d{1,2})\)"));
static PAIRED_MARKER: Lazy<Regex> = Lazy::new(|| regex(r"\(\d{2}\)\("));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| regex(r":\d{2}\((\d+)\)"));
static HEADER_CODE: Lazy<Regex> = Lazy::new(|| regex(r"\((\d{2,3})\)"));
static RESULT: Lazy<Regex> = Lazy::new(|| regex(r"(\d{2}):(\d{2}):(\d{2})(?:\s|$)"));
static NAME_TOKEN: Lazy<Regex> = Lazy::new(|| regex(r"\s(\w+)"));
static HAS_TIME: Lazy<Regex> = Lazy::new(|| regex(r"\d:\d"));

/// Line layouts found in text-block exports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineLayout {
    /// `HH:MM:SS(code)` splits; codes inline
    ClockSplits,
    /// `M:SS(n)` splits with leg places; codes in the bold header
    HeaderCourse,
    /// Bare `M:SS` splits; codes in the bold header, or synthesized
    BareSplits,
    /// `M:SS(code)` splits; codes inline
    InlineCourse,
}

impl LineLayout {
    fn classify(line: &str) -> Self {
        if CLOCK_SPLIT.is_match(line) {
            return Self::ClockSplits;
        }
        let compact = compact(line);
        let short = SPACED_SHORT_SPLIT.is_match(line);
        let small = SMALL_MARKER
            .captures_iter(&compact)
            .filter_map(|caps| caps[1].parse::<u32>().ok())
            .any(|n| n < 10);
        let paired = PAIRED_MARKER.is_match(&compact);

        match (short, small, paired) {
            (true, true, true) => Self::InlineCourse,
            (true, true, false) => Self::HeaderCourse,
            (true, false, _) => Self::InlineCourse,
            (false, _, _) => Self::BareSplits,
        }
    }
}

fn compact(line: &str) -> String {
    line.chars().filter(|c| !c.is_whitespace()).collect()
}

fn normalize_spaces(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn capture_seconds(caps: &regex::Captures<'_>) -> Option<Seconds> {
    let parts: Option<Vec<Seconds>> = caps
        .iter()
        .skip(1)
        .map(|m| m.and_then(|m| m.as_str().parse().ok()))
        .collect();
    parts.map(|parts| parts.iter().fold(0, |acc, part| acc * 60 + part))
}

fn codes(re: &Regex, text: &str) -> Vec<u32> {
    re.captures_iter(text)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// Parse a text-block export. Groups and lines that fail are skipped with a
/// diagnostic.
///
/// # Errors
///
/// Never fails at document level; the `Result` keeps the signature shared
/// with the other parsers.
pub fn parse(content: &str) -> Result<RawEvent, ParseError> {
    let document = Html::parse_document(content);
    let headings: Vec<String> = document
        .select(&H2)
        .filter_map(|h| {
            element_text(h)
                .split_whitespace()
                .next()
                .map(str::to_uppercase)
        })
        .collect();
    let blocks: Vec<ElementRef<'_>> = document.select(&PRE).collect();

    let mut raw = RawEvent::default();
    if headings.len() != blocks.len() {
        raw.skip(
            "document",
            format!(
                "{} group headings but {} text blocks; extra entries ignored",
                headings.len(),
                blocks.len()
            ),
        );
    }

    for (name, block) in headings.into_iter().zip(blocks) {
        match parse_group(&name, block, &mut raw) {
            Ok(Some(group)) => raw.groups.push(group),
            Ok(None) => debug!(group = %name, "Skipping group without runners"),
            Err(e) => raw.skip(format!("group {name}"), e),
        }
    }
    Ok(raw)
}

fn parse_group(
    name: &str,
    block: ElementRef<'_>,
    raw: &mut RawEvent,
) -> Result<Option<RawGroup>, ParseError> {
    let header_codes = block
        .select(&BOLD)
        .next()
        .map(|b| codes(&HEADER_CODE, &compact(&element_text(b))));

    let serialized = block.inner_html();
    let lines: Vec<String> = serialized
        .lines()
        .filter(|line| !line.contains("u>") && !line.contains("<b"))
        .map(strip_tags)
        .filter(|line| HAS_TIME.is_match(line))
        .collect();

    let Some(first) = lines.first() else {
        return Ok(None);
    };
    let layout = LineLayout::classify(first);
    debug!(group = %name, ?layout, lines = lines.len(), "Classified text block");

    if layout == LineLayout::HeaderCourse && header_codes.is_none() {
        return Err(ParseError::UnrecognizedLayout(
            "split layout needs a bold control header".into(),
        ));
    }

    let mut runners = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        match parse_line(line, layout, header_codes.as_deref()) {
            Ok(runner) => runners.push(runner),
            Err(e) => raw.skip(format!("group {name} line {}", i + 1), e),
        }
    }

    if runners.is_empty() {
        return Ok(None);
    }
    Ok(Some(RawGroup {
        name: name.to_string(),
        runners,
    }))
}

fn parse_line(
    line: &str,
    layout: LineLayout,
    header_codes: Option<&[u32]>,
) -> Result<RawRunner, ParseError> {
    let normalized = normalize_spaces(line);
    let name = NAME_TOKEN
        .captures_iter(&normalized)
        .take(2)
        .map(|caps| caps[1].to_uppercase())
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() {
        return Err(ParseError::InvalidFormat("line has no runner name".into()));
    }

    let result = RESULT
        .captures(&normalized)
        .and_then(|caps| capture_seconds(&caps))
        .unwrap_or(DNF_SECONDS);

    let durations: Vec<Seconds> = match layout {
        LineLayout::ClockSplits => CLOCK_SPLIT
            .captures_iter(&normalized)
            .filter_map(|caps| capture_seconds(&caps))
            .collect(),
        LineLayout::HeaderCourse | LineLayout::InlineCourse => SHORT_SPLIT
            .captures_iter(line)
            .filter_map(|caps| capture_seconds(&caps))
            .collect(),
        LineLayout::BareSplits => line.split_whitespace().filter_map(parse_ms).collect(),
    };
    let splits = close_with_result(&durations, result);

    let (legs, ordinal_codes) = match layout {
        LineLayout::ClockSplits | LineLayout::InlineCourse => {
            (Leg::bounded_chain(&codes(&INLINE_CODE, &compact(line))), false)
        }
        LineLayout::HeaderCourse => (Leg::bounded_chain(header_codes.unwrap_or_default()), false),
        LineLayout::BareSplits => match header_codes {
            Some(codes) if codes.len() + 1 == splits.len() => (Leg::bounded_chain(codes), false),
            _ => {
                let ordinals: Vec<u32> = (1..).take(splits.len().saturating_sub(1)).collect();
                (Leg::bounded_chain(&ordinals), true)
            }
        },
    };

    Ok(RawRunner {
        name,
        result,
        legs,
        splits,
        ordinal_codes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(blocks: &str) -> String {
        format!(
            "<html><head><title>Results (WinOrient 2.8)</title></head><body>{blocks}</body></html>"
        )
    }

    #[test]
    fn test_classify_layouts() {
        assert_eq!(
            LineLayout::classify("1 Ivanov Ivan 00:07:30 00:01:40(31) 00:03:20(45)"),
            LineLayout::ClockSplits
        );
        assert_eq!(
            LineLayout::classify("1 Ivanov Ivan 00:07:30  1:40(1)  3:20(2)"),
            LineLayout::HeaderCourse
        );
        assert_eq!(
            LineLayout::classify("1 Ivanov Ivan 00:07:30  1:40(31)  3:20(45)"),
            LineLayout::InlineCourse
        );
        assert_eq!(
            LineLayout::classify("1 Ivanov Ivan 00:07:30  1:40(31)(1)  3:20(45)(2)"),
            LineLayout::InlineCourse
        );
        assert_eq!(
            LineLayout::classify("1 Ivanov Ivan 00:07:30  1:40  3:20"),
            LineLayout::BareSplits
        );
    }

    #[test]
    fn test_clock_splits() {
        let html = page(
            "<h2>M21 (3 km)</h2><pre>
<u>Place Name Club Result</u>
  1 Ivanov Ivan   Club   00:07:30  00:01:40(31) 00:03:20(45)
  2 Petrov Petr   Club   00:08:00  00:02:00(31) 00:03:00(46)
</pre>",
        );
        let raw = parse(&html).unwrap();
        assert_eq!(raw.groups.len(), 1);
        let group = &raw.groups[0];
        assert_eq!(group.name, "M21");

        let ivan = &group.runners[0];
        assert_eq!(ivan.name, "IVANOV IVAN");
        assert_eq!(ivan.result, 450);
        assert_eq!(ivan.legs, Leg::bounded_chain(&[31, 45]));
        assert_eq!(ivan.splits, vec![Some(100), Some(200), Some(150)]);

        let petr = &group.runners[1];
        assert_eq!(petr.legs, Leg::bounded_chain(&[31, 46]));
        assert_eq!(petr.splits, vec![Some(120), Some(180), Some(180)]);
    }

    #[test]
    fn test_header_course() {
        let html = page(
            "<h2>W21</h2><pre><b>Place Name Result  1(31)  2(45)  F</b>
  1 Smirnova Anna   00:07:30  1:40(1)  3:20(2)
  2 Orlova Olga     DNF       2:00(2)  3:00(1)
</pre>",
        );
        let raw = parse(&html).unwrap();
        let group = &raw.groups[0];
        assert_eq!(group.runners.len(), 2);

        let anna = &group.runners[0];
        assert_eq!(anna.legs, Leg::bounded_chain(&[31, 45]));
        assert_eq!(anna.splits, vec![Some(100), Some(200), Some(150)]);

        let olga = &group.runners[1];
        assert_eq!(olga.result, DNF_SECONDS);
        assert_eq!(olga.splits, vec![Some(120), Some(180), None]);
    }

    #[test]
    fn test_bare_splits_with_synthetic_course() {
        let html = page(
            "<h2>M35</h2><pre>
  1 Roe Rick   00:07:30  1:40  3:20
</pre>",
        );
        let raw = parse(&html).unwrap();
        let rick = &raw.groups[0].runners[0];
        assert_eq!(rick.legs, Leg::bounded_chain(&[1, 2]));
        assert!(rick.ordinal_codes);
        assert_eq!(rick.splits, vec![Some(100), Some(200), Some(150)]);
    }

    #[test]
    fn test_bare_splits_with_header_codes() {
        let html = page(
            "<h2>M35</h2><pre><b>Place Name Result (31) (45)</b>
  1 Roe Rick   00:07:30  1:40  3:20
</pre>",
        );
        let raw = parse(&html).unwrap();
        assert_eq!(raw.groups[0].runners[0].legs, Leg::bounded_chain(&[31, 45]));
        assert!(!raw.groups[0].runners[0].ordinal_codes);
    }

    #[test]
    fn test_split_beyond_result_is_missing() {
        let html = page(
            "<h2>M21</h2><pre>
  1 Ivanov Ivan   00:07:30  1:40(31)  9:20(45)
</pre>",
        );
        let raw = parse(&html).unwrap();
        assert_eq!(
            raw.groups[0].runners[0].splits,
            vec![Some(100), None, None]
        );
    }

    #[test]
    fn test_header_course_without_header_is_skipped() {
        let html = page(
            "<h2>W21</h2><pre>
  1 Smirnova Anna   00:07:30  1:40(1)  3:20(2)
</pre>
<h2>M21</h2><pre>
  1 Ivanov Ivan   00:07:30  1:40(31)  3:20(45)
</pre>",
        );
        let raw = parse(&html).unwrap();
        assert_eq!(raw.groups.len(), 1);
        assert_eq!(raw.groups[0].name, "M21");
        assert_eq!(raw.diagnostics.len(), 1);
        assert_eq!(raw.diagnostics[0].record, "group W21");
    }

    #[test]
    fn test_nameless_line_is_skipped() {
        let html = page(
            "<h2>M21</h2><pre>
  1 Ivanov Ivan   00:07:30  1:40(31)  3:20(45)
00:01:00(31)
</pre>",
        );
        let raw = parse(&html).unwrap();
        assert_eq!(raw.groups[0].runners.len(), 1);
        assert_eq!(raw.diagnostics.len(), 1);
        assert_eq!(raw.diagnostics[0].record, "group M21 line 2");
    }
}
