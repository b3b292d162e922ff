//! Parser for federation-style table exports.
//!
//! Each group is an `<h2>` heading followed by a `<table>`; headings and tables
//! are paired in document order. The header row marks the first punch column
//! with `#`. Name cells carry the `cr` class. Punch cells hold the elapsed
//! time at that control, optionally with the control code in brackets
//! (`[31] 12:10`) when each runner has an individual control sequence.
//! Alternatively the header cells list the codes in parentheses (`#1(31)`)
//! when the whole group shares one sequence.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::debug;

use crate::core::types::{Leg, Seconds, DNF_SECONDS, FINISH_CODE, START_CODE};
use crate::parsing::html::{element_text, has_class, H2, TABLE, TD, TH, TR};
use crate::parsing::timing::{find_clock, find_hms, punch_deltas};
use crate::parsing::{ParseError, RawEvent, RawGroup, RawRunner};
use crate::utils::validation::normalize_name;

static HEADER_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d{1,3})\)").expect("valid header code regex"));
static CELL_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d{2,3})\]").expect("valid cell code regex"));

/// How runner names are spread over the `cr` cells of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameLayout {
    /// The full name is in the first name cell
    SingleCell,
    /// Surname and given name are in the first two name cells
    TwoCells,
}

impl NameLayout {
    fn detect(row: ElementRef<'_>) -> Result<Self, ParseError> {
        let cells = name_cells(row);
        let first = cells
            .first()
            .map(|c| element_text(*c))
            .ok_or_else(|| ParseError::UnrecognizedLayout("no name cells in first row".into()))?;

        if first.trim().contains(char::is_whitespace) {
            return Ok(Self::SingleCell);
        }
        match cells.len() {
            2 => Ok(Self::SingleCell),
            3 | 4 => Ok(Self::TwoCells),
            n => Err(ParseError::UnrecognizedLayout(format!(
                "{n} name cells per row with a single-word first cell"
            ))),
        }
    }

    fn extract(self, row: ElementRef<'_>, index: usize) -> String {
        let cells = name_cells(row);
        let text = |i: usize| cells.get(i).map(|c| element_text(*c)).unwrap_or_default();
        let name = match self {
            Self::SingleCell => normalize_name(&text(0)),
            Self::TwoCells => normalize_name(&format!("{} {}", text(0), text(1))),
        };
        if name.is_empty() {
            format!("ND{index}")
        } else {
            name
        }
    }
}

fn name_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.select(&TD).filter(|td| has_class(*td, "cr")).collect()
}

/// Where the control sequence of a group comes from
#[derive(Debug, Clone, PartialEq, Eq)]
enum ControlLayout {
    /// One sequence for the group, read from the punch column headers
    Shared(Vec<Leg>),
    /// Each runner's sequence is read from the bracketed codes in their cells
    PerRunner,
}

impl ControlLayout {
    fn detect(headers: &[String], time_index: usize) -> Result<Self, ParseError> {
        let punch_headers = &headers[time_index..];
        if punch_headers[0].trim().chars().count() <= 3 {
            return Ok(Self::PerRunner);
        }

        let last = punch_headers.len() - 1;
        let mut codes = vec![START_CODE];
        for (i, header) in punch_headers.iter().enumerate() {
            let code = HEADER_CODE
                .captures(header)
                .and_then(|caps| caps[1].parse().ok());
            match code {
                Some(code) => codes.push(code),
                None if i == last => codes.push(FINISH_CODE),
                None => {
                    return Err(ParseError::UnrecognizedLayout(format!(
                        "punch header '{}' has no control code",
                        header.trim()
                    )))
                }
            }
        }
        Ok(Self::Shared(Leg::chain(&codes)))
    }

    fn legs_for(&self, punch_cells: &[ElementRef<'_>]) -> Vec<Leg> {
        match self {
            Self::Shared(legs) => legs.clone(),
            Self::PerRunner => {
                let controls: Vec<u32> = punch_cells
                    .iter()
                    .take(punch_cells.len().saturating_sub(1))
                    .map(|cell| {
                        CELL_CODE
                            .captures(&element_text(*cell))
                            .and_then(|caps| caps[1].parse().ok())
                            .unwrap_or(0)
                    })
                    .collect();
                Leg::bounded_chain(&controls)
            }
        }
    }
}

/// Parse a table export. Groups that fail are skipped with a diagnostic.
///
/// # Errors
///
/// Never fails at document level; the `Result` keeps the signature shared
/// with the other parsers.
pub fn parse(content: &str) -> Result<RawEvent, ParseError> {
    let document = Html::parse_document(content);
    let headings: Vec<String> = document
        .select(&H2)
        .map(|h| normalize_name(&element_text(h)))
        .collect();
    let tables: Vec<ElementRef<'_>> = document.select(&TABLE).collect();

    let mut raw = RawEvent::default();
    if headings.len() != tables.len() {
        raw.skip(
            "document",
            format!(
                "{} group headings but {} tables; extra entries ignored",
                headings.len(),
                tables.len()
            ),
        );
    }

    for (name, table) in headings.into_iter().zip(tables) {
        match parse_group(&name, table) {
            Ok(Some(group)) => raw.groups.push(group),
            Ok(None) => debug!(group = %name, "Skipping group without runners"),
            Err(e) => raw.skip(format!("group {name}"), e),
        }
    }
    Ok(raw)
}

fn parse_group(name: &str, table: ElementRef<'_>) -> Result<Option<RawGroup>, ParseError> {
    let rows: Vec<ElementRef<'_>> = table.select(&TR).collect();
    let Some(data_rows) = rows.get(1..).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };

    let headers: Vec<String> = table.select(&TH).map(element_text).collect();
    let time_index = headers
        .iter()
        .position(|h| h.contains('#'))
        .ok_or_else(|| ParseError::UnrecognizedLayout("no punch column marked with '#'".into()))?;

    let names = NameLayout::detect(data_rows[0])?;
    let controls = ControlLayout::detect(&headers, time_index)?;

    let runners = data_rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let cells: Vec<ElementRef<'_>> = row.select(&TD).collect();
            let punch_cells = cells.get(time_index..).unwrap_or(&[]);

            let mut punches: Vec<Option<Seconds>> = vec![Some(0)];
            punches.extend(punch_cells.iter().map(|c| find_clock(&element_text(*c))));

            RawRunner {
                name: names.extract(*row, i),
                result: find_hms(&row.html()).unwrap_or(DNF_SECONDS),
                legs: controls.legs_for(punch_cells),
                splits: punch_deltas(&punches),
                ordinal_codes: false,
            }
        })
        .collect();

    Ok(Some(RawGroup {
        name: name.to_string(),
        runners,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PER_RUNNER: &str = r#"<html><head><title>Split results</title></head><body>
<h2>M21</h2>
<table>
<tr><th>Place</th><th>Name</th><th>Team</th><th>Result</th><th>#1</th><th>#2</th><th>F</th></tr>
<tr><td>1</td><td class="cr">Ivanov Ivan</td><td class="cr">Club</td><td>0:07:30</td>
<td>[31] 1:40</td><td>[45] 5:00</td><td>7:30</td></tr>
<tr><td>2</td><td class="cr">Petrov Petr</td><td class="cr">Club</td><td>0:07:40</td>
<td>[31] 1:50</td><td>[46] 5:00</td><td>7:40</td></tr>
</table>
<h2>W21</h2>
<table>
<tr><th>Place</th><th>Name</th><th>Result</th><th>#1</th><th>F</th></tr>
</table>
</body></html>"#;

    const SHARED: &str = r#"<html><body>
<h2>W35</h2>
<table>
<tr><th>Place</th><th>Surname</th><th>Name</th><th>Year</th><th>Result</th><th>#1(31)</th><th>#2(45)</th><th>F(240)</th></tr>
<tr><td>1</td><td class="cr">Smirnova</td><td class="cr">Anna</td><td class="cr">1985</td><td>0:10:00</td>
<td>2:00</td><td>6:00</td><td>10:00</td></tr>
<tr><td>2</td><td class="cr">Orlova</td><td class="cr">Olga</td><td class="cr">1986</td><td>DNF</td>
<td>2:30</td><td></td><td>11:00</td></tr>
</table>
</body></html>"#;

    #[test]
    fn test_per_runner_controls() {
        let raw = parse(PER_RUNNER).unwrap();
        assert_eq!(raw.groups.len(), 1, "empty W21 is skipped");

        let group = &raw.groups[0];
        assert_eq!(group.name, "M21");
        assert_eq!(group.runners.len(), 2);

        let ivan = &group.runners[0];
        assert_eq!(ivan.name, "IVANOV IVAN");
        assert_eq!(ivan.result, 450);
        assert_eq!(ivan.legs, Leg::bounded_chain(&[31, 45]));
        assert_eq!(ivan.splits, vec![Some(100), Some(200), Some(150)]);

        let petr = &group.runners[1];
        assert_eq!(petr.legs, Leg::bounded_chain(&[31, 46]));
        assert_eq!(petr.splits, vec![Some(110), Some(190), Some(160)]);
        assert!(raw.diagnostics.is_empty());
    }

    #[test]
    fn test_shared_controls_and_two_cell_names() {
        let raw = parse(SHARED).unwrap();
        let group = &raw.groups[0];
        assert_eq!(group.name, "W35");

        let anna = &group.runners[0];
        assert_eq!(anna.name, "SMIRNOVA ANNA");
        assert_eq!(anna.legs, Leg::bounded_chain(&[31, 45]));
        assert_eq!(anna.splits, vec![Some(120), Some(240), Some(240)]);

        let olga = &group.runners[1];
        assert_eq!(olga.name, "ORLOVA OLGA");
        assert_eq!(olga.result, DNF_SECONDS);
        assert_eq!(olga.splits, vec![Some(150), None, None]);
    }

    #[test]
    fn test_names_match_data_rows() {
        for html in [PER_RUNNER, SHARED] {
            let raw = parse(html).unwrap();
            for group in &raw.groups {
                for runner in &group.runners {
                    assert_eq!(runner.legs.len(), runner.splits.len());
                }
            }
        }
        assert_eq!(parse(SHARED).unwrap().groups[0].runners.len(), 2);
    }

    #[test]
    fn test_broken_group_is_isolated() {
        let html = r#"<html><body>
<h2>M21</h2>
<table><tr><th>Name</th><th>Result</th></tr>
<tr><td class="cr">Doe John</td><td>0:10:00</td></tr></table>
<h2>M35</h2>
<table><tr><th>Name</th><th>Club</th><th>#1</th><th>F</th></tr>
<tr><td class="cr">Roe Rick</td><td class="cr">OK</td><td>[31] 2:00</td><td>5:00</td></tr></table>
</body></html>"#;
        let raw = parse(html).unwrap();
        assert_eq!(raw.groups.len(), 1);
        assert_eq!(raw.groups[0].name, "M35");
        assert_eq!(raw.diagnostics.len(), 1);
        assert_eq!(raw.diagnostics[0].record, "group M21");
        // No H:MM:SS anywhere in the row
        assert_eq!(raw.groups[0].runners[0].result, DNF_SECONDS);
    }

    #[test]
    fn test_unrecognized_name_layout() {
        let html = r#"<h2>M21</h2><table><tr><th>Name</th><th>#1</th></tr>
<tr><td class="cr">Doe</td><td>1:00</td></tr></table>"#;
        let raw = parse(html).unwrap();
        assert!(raw.groups.is_empty());
        assert!(raw.diagnostics[0].reason.contains("Unrecognized layout"));
    }
}
