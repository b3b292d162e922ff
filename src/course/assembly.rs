//! Assembly of parser output into the canonical event model.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::core::event::{Course, Event, EventData, Group, LegRecord, Runner, SplitMatrix, SplitRow};
use crate::core::types::{GroupId, LegId, RunnerId};
use crate::course::builder::CourseBuilder;
use crate::parsing::format_detection::DocumentFormat;
use crate::parsing::{ParseError, RawEvent, RawRunner};
use crate::utils::validation::{check_runner_limit, document_checksum, normalize_name, split_display_name};

/// Document-level facts recorded on the assembled [`Event`]
#[derive(Debug, Clone)]
pub struct EventMeta<'a> {
    pub title: String,
    pub source: String,
    pub date: Option<NaiveDate>,
    pub format: DocumentFormat,
    /// Full document text, for the checksum
    pub content: &'a str,
    pub max_runners: usize,
}

struct MergedGroup {
    id: GroupId,
    name: String,
    runners: Vec<RawRunner>,
}

/// Groups keyed by upper-cased name; repeated headings are folded together
fn merge_groups(raw: &mut RawEvent) -> Vec<MergedGroup> {
    let mut merged: Vec<MergedGroup> = Vec::new();
    let mut positions: HashMap<GroupId, usize> = HashMap::new();
    for group in std::mem::take(&mut raw.groups) {
        let id = GroupId(normalize_name(&group.name));
        match positions.get(&id) {
            Some(&i) => {
                debug!(group = %id, "Merging repeated group");
                merged[i].runners.extend(group.runners);
            }
            None => {
                positions.insert(id.clone(), merged.len());
                merged.push(MergedGroup {
                    id,
                    name: group.name,
                    runners: group.runners,
                });
            }
        }
    }
    merged
}

/// Display names made unique within a group. Every occurrence of a repeated
/// name gets `*<row>` appended, `row` being its 1-based position in the group.
fn unique_names(runners: &[RawRunner]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for runner in runners {
        *counts.entry(normalize_name(&runner.name)).or_default() += 1;
    }
    runners
        .iter()
        .enumerate()
        .map(|(i, runner)| {
            let name = normalize_name(&runner.name);
            if counts.get(&name).copied().unwrap_or(0) > 1 {
                format!("{name}*{}", i + 1)
            } else {
                name
            }
        })
        .collect()
}

/// Build the canonical event from raw parser output.
///
/// Runners whose leg and split counts differ are dropped with a diagnostic.
/// Groups left without runners are dropped silently.
///
/// # Errors
///
/// Returns `ParseError::TooManyRunners` above the runner limit and
/// `ParseError::InvalidFormat` when no runner survives.
pub fn assemble_event(mut raw: RawEvent, meta: &EventMeta<'_>) -> Result<EventData, ParseError> {
    let merged = merge_groups(&mut raw);
    let total: usize = merged.iter().map(|g| g.runners.len()).sum();

    let mut groups = Vec::new();
    let mut courses = Vec::new();
    let mut runners: Vec<Runner> = Vec::new();
    let mut splits = SplitMatrix::new();
    let mut legs: Vec<LegRecord> = Vec::new();
    let mut seen_legs: HashSet<LegId> = HashSet::new();

    for group in merged {
        let names = unique_names(&group.runners);
        // (id, display name without disambiguator, runner)
        let mut members: Vec<(RunnerId, String, RawRunner)> = Vec::new();
        for (display, runner) in names.into_iter().zip(group.runners) {
            let id = RunnerId(format!("{display}^{}", group.id));
            if runner.legs.len() != runner.splits.len() {
                let mismatch = ParseError::LengthMismatch {
                    runner: id.clone(),
                    legs: runner.legs.len(),
                    splits: runner.splits.len(),
                };
                raw.skip(format!("runner {id}"), mismatch);
                continue;
            }
            if let Some(message) = check_runner_limit(runners.len() + members.len(), meta.max_runners) {
                warn!("{message}");
                return Err(ParseError::TooManyRunners(total));
            }
            let base = normalize_name(&runner.name);
            members.push((id, base, runner));
        }
        if members.is_empty() {
            debug!(group = %group.id, "Group has no usable runners");
            continue;
        }

        let mut builder = CourseBuilder::new(group.id.clone());
        for (i, (_, _, runner)) in members.iter().enumerate() {
            builder.add(i, &runner.legs, runner.ordinal_codes);
        }
        let dispersions = builder.build();

        let mut course_of = vec![0; members.len()];
        for (c, dispersion) in dispersions.iter().enumerate() {
            for &member in &dispersion.members {
                course_of[member] = c;
            }
            for (leg, id) in dispersion.legs.iter().zip(&dispersion.leg_ids) {
                if seen_legs.insert(id.clone()) {
                    legs.push(LegRecord {
                        id: id.clone(),
                        start: leg.start,
                        end: leg.end,
                        group: dispersion.ordinal_codes.then(|| group.id.clone()),
                    });
                }
            }
        }

        let mut group_runners = Vec::with_capacity(members.len());
        for (i, (id, base, runner)) in members.into_iter().enumerate() {
            let course = &dispersions[course_of[i]];
            let (surname, name) = split_display_name(&base);

            let row = course
                .leg_ids
                .iter()
                .cloned()
                .zip(runner.splits.iter().copied())
                .collect();
            splits.insert(id.clone(), SplitRow::new(row));

            group_runners.push(id.clone());
            runners.push(Runner {
                id,
                name,
                surname,
                group: group.id.clone(),
                course: course.id.clone(),
                result: runner.result,
            });
        }

        groups.push(Group {
            id: group.id.clone(),
            name: group.name,
            runners: group_runners,
            courses: dispersions.iter().map(|d| d.id.clone()).collect(),
        });
        courses.extend(dispersions.into_iter().map(|d| Course {
            id: d.id,
            group: group.id.clone(),
            legs: d.leg_ids,
        }));
    }

    if runners.is_empty() {
        return Err(ParseError::InvalidFormat(format!(
            "no runners found in {}",
            meta.source
        )));
    }

    info!(
        groups = groups.len(),
        courses = courses.len(),
        legs = legs.len(),
        runners = runners.len(),
        skipped = raw.diagnostics.len(),
        "Assembled event"
    );

    let event = Event {
        title: meta.title.clone(),
        source: meta.source.clone(),
        date: meta.date,
        format: meta.format,
        count: runners.len(),
        checksum: document_checksum(meta.content),
    };
    EventData::assemble(event, groups, legs, courses, runners, splits, raw.diagnostics)
        .map_err(|e| ParseError::InvalidFormat(e.to_string()))
}
