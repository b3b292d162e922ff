//! Document Parsing Test Suite
//!
//! End-to-end parses of each supported export layout, bundle persistence,
//! and the input limits that protect against oversized documents.

use chrono::NaiveDate;
use orient_splits::core::types::{GroupId, LegId, RunnerId, SplitCell, DNF_SECONDS};
use orient_splits::parsing::format_detection::DocumentFormat;
use orient_splits::parsing::{parse_document, parse_document_bytes, ParseConfig, ParseError};
use orient_splits::statistics::{StatisticsEngine, StatsError};
use orient_splits::EventData;
use tempfile::TempDir;

const TABLE: &str = r#"<html><head><title>Spring Cup  split times</title></head><body>
<h2>M21</h2>
<table>
<tr><th>Place</th><th>Name</th><th>Team</th><th>Result</th><th>#1</th><th>#2</th><th>F</th></tr>
<tr><td>1</td><td class="cr">Ivanov Ivan</td><td class="cr">Club</td><td>0:07:30</td>
<td>[31] 1:40</td><td>[45] 5:00</td><td>7:30</td></tr>
<tr><td>2</td><td class="cr">Petrov Petr</td><td class="cr">Club</td><td>0:07:40</td>
<td>[31] 1:50</td><td>[45] 5:00</td><td>7:40</td></tr>
<tr><td>3</td><td class="cr">Sidorov Semen</td><td class="cr">Club</td><td>0:08:00</td>
<td>[31] 1:45</td><td>[46] 4:00</td><td>8:00</td></tr>
</table>
</body></html>"#;

const WINORIENT: &str = "<html><head><title>Results (WinOrient 2.8)</title></head><body>
<h2>W21 (2.5 km)</h2><pre>
<u>Place Name Club Result</u>
  1 Smirnova Anna   Club   00:07:30  00:01:40(31) 00:03:20(45)
  2 Orlova Olga     Club   00:08:00  00:02:00(31) 00:03:00(45)
</pre></body></html>";

const SPORTORG: &str = r#"<html><head><title>SportOrg results</title></head><body>
<script>
var race = {"groups":[{"id":"g1","name":"M40 Veterans"}],"persons":[{"id":"p1","group_id":"g1","name":"Oleg","surname":"Kuznetsov"}],"results":[{"person_id":"p1","result_msec":600000,"splits":[{"code":"31","leg_time":120000,"relative_time":120000},{"code":"32","leg_time":300000,"relative_time":420000}]}]};
</script>
</body></html>"#;

const BARE_SPLITS: &str = "<html><head><title>Results (WinOrient 2.8)</title></head><body>
<h2>W21</h2><pre>
  1 Doe Jane   00:07:30  1:40  3:20
</pre>
<h2>M35</h2><pre>
  1 Roe Rick   00:08:00  2:00  3:00
</pre></body></html>";

fn config() -> ParseConfig {
    ParseConfig {
        date: NaiveDate::from_ymd_opt(2024, 4, 14),
        source: Some("spring.html".to_string()),
        ..ParseConfig::default()
    }
}

/// Table export: courses detected per control sequence
#[test]
fn test_table_export() {
    let outcome = parse_document(TABLE, &config()).unwrap();
    let event = &outcome.event;

    assert_eq!(event.event.title, "Spring Cup split times");
    assert_eq!(event.event.format, DocumentFormat::Table);
    assert_eq!(event.event.count, 3);
    assert_eq!(event.groups.len(), 1);
    assert_eq!(event.groups[0].courses.len(), 2);
    assert!(outcome.diagnostics.is_empty());

    let ivan = RunnerId::new("IVANOV IVAN^M21");
    assert_eq!(
        event.splits.get(&ivan, &LegId::new("31-45")),
        Some(SplitCell::Time(200))
    );
    assert_eq!(
        event.splits.get(&ivan, &LegId::new("31-46")),
        Some(SplitCell::NotApplicable)
    );
}

/// Text-block export with clock splits and inline control codes
#[test]
fn test_winorient_export() {
    let outcome = parse_document(WINORIENT, &config()).unwrap();
    let event = &outcome.event;
    assert_eq!(event.event.format, DocumentFormat::TextBlock);

    let anna = event.runner(&RunnerId::new("SMIRNOVA ANNA^W21")).unwrap();
    assert_eq!(anna.surname, "SMIRNOVA");
    assert_eq!(anna.result, 450);
    let row = event.splits.row(&anna.id).unwrap();
    assert_eq!(row.values(), vec![Some(100), Some(200), Some(150)]);
}

/// Embedded race data: group id is the first word of the group name
#[test]
fn test_sportorg_export() {
    let outcome = parse_document(SPORTORG, &config()).unwrap();
    let event = &outcome.event;
    assert_eq!(event.event.format, DocumentFormat::EmbeddedJson);
    assert_eq!(event.groups[0].id.as_str(), "M40");

    let oleg = RunnerId::new("KUZNETSOV OLEG^M40");
    let row = event.splits.row(&oleg).unwrap();
    assert_eq!(row.values(), vec![Some(120), Some(300), Some(180)]);
}

/// Bad bytes are replaced rather than rejected
#[test]
fn test_lossy_bytes() {
    let mut bytes = TABLE.as_bytes().to_vec();
    bytes.extend_from_slice(&[0xff, 0xfe]);
    let outcome = parse_document_bytes(&bytes, &config()).unwrap();
    assert_eq!(outcome.event.runners.len(), 3);
}

/// A broken group is skipped and reported; the rest of the document survives
#[test]
fn test_broken_group_is_isolated() {
    let broken = TABLE.replace(
        "</body>",
        "<h2>W35</h2><table><tr><th>Place</th><th>Name</th></tr><tr><td>1</td><td>x</td></tr></table></body>",
    );
    let outcome = parse_document(&broken, &config()).unwrap();
    assert_eq!(outcome.event.groups.len(), 1);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert!(outcome.diagnostics[0].record.contains("W35"));
}

/// Runners without a finish time get the DNF sentinel
#[test]
fn test_dnf_runner() {
    let dnf = TABLE.replace("<td>0:08:00</td>", "<td>DSQ</td>");
    let outcome = parse_document(&dnf, &config()).unwrap();
    let semen = outcome
        .event
        .runner(&RunnerId::new("SIDOROV SEMEN^M21"))
        .unwrap();
    assert_eq!(semen.result, DNF_SECONDS);
    assert!(!semen.finished());
}

/// Bundles survive a save/load cycle with their invariants re-checked
#[test]
fn test_bundle_save_and_load() {
    let outcome = parse_document(TABLE, &config()).unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("event.json");

    outcome.event.save(&path).unwrap();
    let loaded = EventData::load(&path).unwrap();
    assert_eq!(loaded.event, outcome.event.event);
    assert_eq!(loaded.runners, outcome.event.runners);
    assert!(loaded.runner(&RunnerId::new("PETROV PETR^M21")).is_some());
}

/// Reparsing the same document yields identical identifiers
#[test]
fn test_identifiers_are_deterministic() {
    let first = parse_document(TABLE, &config()).unwrap().event;
    let second = parse_document(TABLE, &config()).unwrap().event;
    let ids = |e: &EventData| e.runners.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.event.checksum, second.event.checksum);
}

/// The runner limit rejects documents above it
#[test]
fn test_runner_limit() {
    let limited = ParseConfig {
        max_runners: 2,
        ..config()
    };
    let err = parse_document(TABLE, &limited).unwrap_err();
    assert!(matches!(err, ParseError::TooManyRunners(3)));
}

/// Empty and runner-less documents are errors naming the problem
#[test]
fn test_unusable_documents() {
    assert!(matches!(
        parse_document("", &config()),
        Err(ParseError::EmptyDocument)
    ));
    let err = parse_document("<html><title>Nothing</title></html>", &config()).unwrap_err();
    assert!(err.to_string().contains("spring.html"));
}

/// Without printed codes each group's legs stay its own
#[test]
fn test_bare_split_legs_are_not_shared_between_groups() {
    let event = parse_document(BARE_SPLITS, &config()).unwrap().event;
    let engine = StatisticsEngine::new(&event);

    let expected = [
        ("1-2@W21", "DOE JANE^W21", 200),
        ("1-2@M35", "ROE RICK^M35", 180),
    ];
    for (leg, runner, seconds) in expected {
        let board = engine.leg_leaderboard(&LegId::new(leg), None).unwrap();
        assert_eq!(board.len(), 1, "{leg}");
        assert_eq!(board[0].runner, RunnerId::new(runner));
        assert_eq!(board[0].value, seconds);
    }
    assert_eq!(
        event.leg(&LegId::new("1-2@M35")).unwrap().group,
        Some(GroupId::new("M35"))
    );
    assert!(matches!(
        engine.leg_leaderboard(&LegId::new("1-2"), None),
        Err(StatsError::NotFound { kind: "leg", .. })
    ));
}

/// Parsed splits of every complete runner add up to the finish result
#[test]
fn test_splits_add_up_to_result() {
    for document in [TABLE, WINORIENT, SPORTORG, BARE_SPLITS] {
        let event = parse_document(document, &config()).unwrap().event;
        let mut checked = 0;
        for runner in event.runners.iter().filter(|r| r.finished()) {
            let values = event.splits.row(&runner.id).unwrap().values();
            if values.iter().any(Option::is_none) {
                continue;
            }
            let total: u32 = values.into_iter().flatten().sum();
            assert!(
                total.abs_diff(runner.result) <= 1,
                "{}: splits sum to {total}, result {}",
                runner.id,
                runner.result
            );
            checked += 1;
        }
        assert_eq!(checked, event.runners.len(), "{}", event.event.title);
    }
}
