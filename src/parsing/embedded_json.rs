//! Parser for SportOrg pages, which embed the whole race as a script literal
//! (`var race = {...};`). Only the `groups`, `persons` and `results` arrays are
//! read; every other field is ignored.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::core::types::{Leg, Seconds, DNF_SECONDS, FINISH_CODE, START_CODE};
use crate::parsing::timing::millis_to_seconds;
use crate::parsing::{ParseError, RawEvent, RawGroup, RawRunner};
use crate::utils::validation::normalize_name;

const RACE_MARKER: &str = "var race =";

/// Persons and results stay untyped until each record is converted on its
/// own, so one malformed record only costs that person.
#[derive(Debug, Deserialize)]
struct RaceData {
    #[serde(default)]
    groups: Vec<RaceGroup>,
    #[serde(default)]
    persons: Vec<Value>,
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RaceGroup {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RacePerson {
    id: String,
    #[serde(default)]
    group_id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    surname: String,
}

#[derive(Debug, Deserialize)]
struct RaceResult {
    person_id: Option<String>,
    #[serde(default)]
    result_msec: Option<i64>,
    #[serde(default)]
    splits: Vec<RaceSplit>,
}

#[derive(Debug, Deserialize)]
struct RaceSplit {
    code: ControlCode,
    #[serde(default)]
    leg_time: i64,
    #[serde(default)]
    relative_time: i64,
}

/// Control codes are written either as numbers or as numeric strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ControlCode {
    Number(u32),
    Text(String),
}

impl ControlCode {
    fn value(&self) -> Result<u32, ParseError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| ParseError::InvalidFormat(format!("control code '{s}' is not a number"))),
        }
    }
}

/// Cut the race object literal out of the page
fn race_literal(content: &str) -> Result<&str, ParseError> {
    let line = content
        .lines()
        .find(|line| line.contains(RACE_MARKER))
        .ok_or_else(|| ParseError::InvalidFormat(format!("no '{RACE_MARKER}' literal found")))?;
    let start = line
        .find('{')
        .ok_or_else(|| ParseError::InvalidFormat("race literal has no object".into()))?;
    let literal = line[start..].trim_end();
    Ok(literal.strip_suffix(';').unwrap_or(literal))
}

/// Parse a SportOrg page. People who cannot be processed are skipped with a
/// diagnostic.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if the race literal is missing and
/// `ParseError::Json` if it is not valid race JSON.
pub fn parse(content: &str) -> Result<RawEvent, ParseError> {
    let race: RaceData = serde_json::from_str(race_literal(content)?)?;
    debug!(
        groups = race.groups.len(),
        persons = race.persons.len(),
        results = race.results.len(),
        "Loaded embedded race data"
    );

    let mut results: HashMap<String, Result<RaceResult, serde_json::Error>> = HashMap::new();
    for value in race.results {
        if let Some(person_id) = value.get("person_id").and_then(Value::as_str) {
            let person_id = person_id.to_string();
            results.insert(person_id, serde_json::from_value(value));
        }
    }

    let mut raw = RawEvent::default();
    let mut persons = Vec::with_capacity(race.persons.len());
    for value in race.persons {
        let record = person_record(&value);
        match serde_json::from_value::<RacePerson>(value) {
            Ok(person) => persons.push(person),
            Err(e) => raw.skip(record, e),
        }
    }

    for person in &persons {
        let known = person
            .group_id
            .as_deref()
            .is_some_and(|id| race.groups.iter().any(|g| g.id == id));
        if !known {
            raw.skip(format!("person {}", person.id), "no matching group");
        }
    }

    for group in &race.groups {
        let name = group
            .name
            .split_whitespace()
            .next()
            .unwrap_or(group.id.as_str())
            .to_uppercase();

        let mut runners = Vec::new();
        for person in persons
            .iter()
            .filter(|p| p.group_id.as_deref() == Some(group.id.as_str()))
        {
            let record = format!("person {}", person.id);
            match results.get(person.id.as_str()) {
                Some(Ok(result)) => match person_runner(person, result) {
                    Ok(runner) => runners.push(runner),
                    Err(e) => raw.skip(record, e),
                },
                Some(Err(e)) => raw.skip(record, e),
                None => raw.skip(record, "no result record"),
            }
        }

        if runners.is_empty() {
            debug!(group = %name, "Skipping group without runners");
        } else {
            raw.groups.push(RawGroup { name, runners });
        }
    }
    Ok(raw)
}

/// Diagnostic label for a person record that may not deserialize
fn person_record(value: &Value) -> String {
    match value.get("id") {
        Some(Value::String(id)) => format!("person {id}"),
        Some(id) if !id.is_null() => format!("person {id}"),
        _ => "person ?".to_string(),
    }
}

fn person_runner(person: &RacePerson, result: &RaceResult) -> Result<RawRunner, ParseError> {
    let name = normalize_name(&format!("{} {}", person.surname, person.name));
    if name.is_empty() {
        return Err(ParseError::InvalidFormat("person has no name".into()));
    }

    let finish = result
        .result_msec
        .filter(|&ms| ms > 0)
        .and_then(millis_to_seconds)
        .unwrap_or(DNF_SECONDS);

    let punches: Vec<&RaceSplit> = result.splits.iter().filter(|s| s.leg_time > 0).collect();
    let Some(last) = punches.last() else {
        let split = (finish < DNF_SECONDS).then_some(finish);
        return Ok(RawRunner {
            name,
            result: finish,
            legs: vec![Leg::new(START_CODE, FINISH_CODE)],
            splits: vec![split],
            ordinal_codes: false,
        });
    };

    let mut codes = vec![START_CODE];
    for punch in &punches {
        codes.push(punch.code.value()?);
    }
    codes.push(FINISH_CODE);

    let mut splits: Vec<Option<Seconds>> = punches
        .iter()
        .map(|p| millis_to_seconds(p.leg_time))
        .collect();
    let finish_leg = if finish >= DNF_SECONDS {
        None
    } else {
        millis_to_seconds(i64::from(finish) * 1000 - last.relative_time).filter(|&s| s > 0)
    };
    splits.push(finish_leg);

    let regressions: Vec<usize> = punches
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0].relative_time > w[1].relative_time)
        .map(|(i, _)| i + 1)
        .collect();
    if let Some(&tail) = regressions.last() {
        for i in regressions.iter().copied().chain(std::iter::once(tail + 1)) {
            if let Some(split) = splits.get_mut(i) {
                *split = None;
            }
        }
    }

    Ok(RawRunner {
        name,
        result: finish,
        legs: Leg::chain(&codes),
        splits,
        ordinal_codes: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(race: &str) -> String {
        format!(
            "<html><head><title>SportOrg results</title></head><body>\n<script>\nvar race = {race};\n</script>\n</body></html>"
        )
    }

    const RACE: &str = r#"{"groups":[{"id":"g1","name":"M21 Elite"},{"id":"g2","name":"W21"}],
"persons":[{"id":"p1","group_id":"g1","name":"Ivan","surname":"Ivanov"},
{"id":"p2","group_id":"g1","name":"Petr","surname":"Petrov"},
{"id":"p3","group_id":"g2","name":"Anna","surname":"Smirnova"},
{"id":"p4","group_id":"g9","name":"Lost","surname":"Soul"}],
"results":[{"person_id":"p1","result_msec":450000,"splits":[
  {"code":"31","leg_time":100000,"relative_time":100000},
  {"code":45,"leg_time":200400,"relative_time":300400}]},
{"person_id":"p2","result_msec":480000,"splits":[
  {"code":"31","leg_time":0,"relative_time":0},
  {"code":"46","leg_time":300000,"relative_time":300000}]}]}"#;

    #[test]
    fn test_race_literal_extraction() {
        let html = page(r#"{"groups":[]}"#);
        assert_eq!(race_literal(&html).unwrap(), r#"{"groups":[]}"#);
        assert!(matches!(
            race_literal("<html></html>"),
            Err(ParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_race() {
        let raw = parse(&page(&RACE.replace('\n', ""))).unwrap();
        assert_eq!(raw.groups.len(), 1, "W21 has no results");

        let group = &raw.groups[0];
        assert_eq!(group.name, "M21");

        let ivan = &group.runners[0];
        assert_eq!(ivan.name, "IVANOV IVAN");
        assert_eq!(ivan.result, 450);
        assert_eq!(ivan.legs, Leg::bounded_chain(&[31, 45]));
        assert_eq!(ivan.splits, vec![Some(100), Some(200), Some(150)]);

        // Zero leg time drops the punch
        let petr = &group.runners[1];
        assert_eq!(petr.legs, Leg::bounded_chain(&[46]));
        assert_eq!(petr.splits, vec![Some(300), Some(180)]);

        let records: Vec<&str> = raw.diagnostics.iter().map(|d| d.record.as_str()).collect();
        assert!(records.contains(&"person p3"));
        assert!(records.contains(&"person p4"));
    }

    #[test]
    fn test_regression_nulls_following_legs() {
        let race = r#"{"groups":[{"id":"g","name":"M40"}],
"persons":[{"id":"p","group_id":"g","name":"A","surname":"B"}],
"results":[{"person_id":"p","result_msec":900000,"splits":[
{"code":31,"leg_time":100000,"relative_time":100000},
{"code":32,"leg_time":100000,"relative_time":400000},
{"code":33,"leg_time":100000,"relative_time":300000},
{"code":34,"leg_time":100000,"relative_time":500000}]}]}"#;
        let raw = parse(&page(&race.replace('\n', ""))).unwrap();
        let runner = &raw.groups[0].runners[0];
        assert_eq!(
            runner.splits,
            vec![Some(100), Some(100), None, None, Some(400)]
        );
    }

    #[test]
    fn test_no_punches_and_dnf() {
        let race = r#"{"groups":[{"id":"g","name":"M40"}],
"persons":[{"id":"a","group_id":"g","name":"A","surname":"B"},{"id":"c","group_id":"g","name":"C","surname":"D"}],
"results":[{"person_id":"a","result_msec":600000,"splits":[]},
{"person_id":"c","result_msec":0,"splits":[{"code":"31","leg_time":50000,"relative_time":50000}]}]}"#;
        let raw = parse(&page(&race.replace('\n', ""))).unwrap();
        let runners = &raw.groups[0].runners;
        assert_eq!(runners[0].legs, vec![Leg::new(START_CODE, FINISH_CODE)]);
        assert_eq!(runners[0].splits, vec![Some(600)]);

        assert_eq!(runners[1].result, DNF_SECONDS);
        assert_eq!(runners[1].splits, vec![Some(50), None]);
    }

    #[test]
    fn test_bad_code_skips_person() {
        let race = r#"{"groups":[{"id":"g","name":"M40"}],"persons":[{"id":"a","group_id":"g","name":"A","surname":"B"}],"results":[{"person_id":"a","result_msec":600000,"splits":[{"code":"K1","leg_time":5000,"relative_time":5000}]}]}"#;
        let raw = parse(&page(race)).unwrap();
        assert!(raw.groups.is_empty());
        assert_eq!(raw.diagnostics[0].record, "person a");
    }

    #[test]
    fn test_malformed_records_skip_only_their_person() {
        let race = r#"{"groups":[{"id":"g","name":"M40"}],
"persons":[{"id":"a","group_id":"g","name":"A","surname":"B"},
{"id":"b","group_id":"g","name":null,"surname":"C"},
{"id":"c","group_id":"g","name":"E","surname":"D"}],
"results":[{"person_id":"a","result_msec":300000,"splits":[{"code":31,"leg_time":100000,"relative_time":100000}]},
{"person_id":"b","result_msec":300000,"splits":[]},
{"person_id":"c","result_msec":300000,"splits":[{"leg_time":100000,"relative_time":100000}]}]}"#;
        let raw = parse(&page(&race.replace('\n', ""))).unwrap();

        assert_eq!(raw.groups.len(), 1);
        let runners = &raw.groups[0].runners;
        assert_eq!(runners.len(), 1);
        assert_eq!(runners[0].name, "B A");
        assert_eq!(runners[0].splits, vec![Some(100), Some(200)]);

        let records: Vec<&str> = raw.diagnostics.iter().map(|d| d.record.as_str()).collect();
        assert_eq!(records, vec!["person b", "person c"]);
    }

    #[test]
    fn test_person_record_label() {
        assert_eq!(person_record(&serde_json::json!({"id": "p7"})), "person p7");
        assert_eq!(person_record(&serde_json::json!({"id": 7})), "person 7");
        assert_eq!(person_record(&serde_json::json!({"name": "x"})), "person ?");
    }

    #[test]
    fn test_invalid_json() {
        let err = parse(&page("{not json")).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }
}
