use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

use crate::core::types::{
    CourseId, Diagnostic, GroupId, LegId, RunnerId, Seconds, SplitCell, DNF_SECONDS,
};
use crate::parsing::format_detection::DocumentFormat;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Failed to read event bundle: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse event bundle: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Runner {runner} has {legs} legs on its course but {splits} splits")]
    LengthMismatch {
        runner: RunnerId,
        legs: usize,
        splits: usize,
    },

    #[error("Dangling reference: {0}")]
    DanglingReference(String),
}

/// Bundle version for compatibility checking
pub const BUNDLE_VERSION: &str = "1.0.0";

/// Metadata of one parsed results document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,

    /// URL or filename the document came from (diagnostics only)
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    pub format: DocumentFormat,

    /// Number of runners in the event
    pub count: usize,

    /// MD5 of the document text, lets storage detect re-uploads of the same export
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// Members in document order
    pub runners: Vec<RunnerId>,
    pub courses: Vec<CourseId>,
}

/// A leg in the event-wide leg table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegRecord {
    pub id: LegId,
    pub start: u32,
    pub end: u32,
    /// Owning group of a leg between ordinal controls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub group: GroupId,
    pub legs: Vec<LegId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runner {
    pub id: RunnerId,
    pub name: String,
    pub surname: String,
    pub group: GroupId,
    pub course: CourseId,
    /// Elapsed time from start to finish, `DNF_SECONDS` when unknown
    pub result: Seconds,
}

impl Runner {
    #[must_use]
    pub fn finished(&self) -> bool {
        self.result < DNF_SECONDS
    }
}

/// One runner's splits, ordered like the legs of the runner's course.
///
/// Serialized as a JSON object `leg -> seconds | null`; key order is preserved
/// in both directions so a course that repeats a leg survives a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitRow {
    cells: Vec<(LegId, Option<Seconds>)>,
}

impl SplitRow {
    #[must_use]
    pub fn new(cells: Vec<(LegId, Option<Seconds>)>) -> Self {
        Self { cells }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn legs(&self) -> impl Iterator<Item = &LegId> {
        self.cells.iter().map(|(leg, _)| leg)
    }

    #[must_use]
    pub fn values(&self) -> Vec<Option<Seconds>> {
        self.cells.iter().map(|(_, value)| *value).collect()
    }

    /// Value of the first occurrence of `leg` on this row
    #[must_use]
    pub fn get(&self, leg: &LegId) -> SplitCell {
        self.get_nth(leg, 0)
    }

    /// Value of the `occurrence`-th (0-based) run of `leg` on this row.
    /// Courses that cross the same control pair twice repeat the leg.
    #[must_use]
    pub fn get_nth(&self, leg: &LegId, occurrence: usize) -> SplitCell {
        match self.cells.iter().filter(|(id, _)| id == leg).nth(occurrence) {
            Some((_, Some(seconds))) => SplitCell::Time(*seconds),
            Some((_, None)) => SplitCell::Missing,
            None => SplitCell::NotApplicable,
        }
    }
}

impl Serialize for SplitRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (leg, value) in &self.cells {
            map.serialize_entry(leg, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SplitRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = SplitRow;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of leg id to seconds or null")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SplitRow, A::Error> {
                let mut cells = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((leg, value)) = access.next_entry::<LegId, Option<Seconds>>()? {
                    cells.push((leg, value));
                }
                Ok(SplitRow { cells })
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// Sparse runner x leg table of split times
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SplitMatrix {
    rows: BTreeMap<RunnerId, SplitRow>,
}

impl SplitMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, runner: RunnerId, row: SplitRow) {
        self.rows.insert(runner, row);
    }

    #[must_use]
    pub fn row(&self, runner: &RunnerId) -> Option<&SplitRow> {
        self.rows.get(runner)
    }

    /// Cell lookup; `None` when the runner is not in the matrix at all
    #[must_use]
    pub fn get(&self, runner: &RunnerId, leg: &LegId) -> Option<SplitCell> {
        self.rows.get(runner).map(|row| row.get(leg))
    }

    #[must_use]
    pub fn get_nth(
        &self,
        runner: &RunnerId,
        leg: &LegId,
        occurrence: usize,
    ) -> Option<SplitCell> {
        self.rows.get(runner).map(|row| row.get_nth(leg, occurrence))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The canonical, persisted form of a parsed event.
///
/// Read-only once built: statistics only borrow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub version: String,
    pub event: Event,
    pub groups: Vec<Group>,
    pub legs: Vec<LegRecord>,
    pub courses: Vec<Course>,
    pub runners: Vec<Runner>,
    pub splits: SplitMatrix,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,

    #[serde(skip)]
    group_index: HashMap<GroupId, usize>,
    #[serde(skip)]
    runner_index: HashMap<RunnerId, usize>,
    #[serde(skip)]
    course_index: HashMap<CourseId, usize>,
    #[serde(skip)]
    leg_index: HashMap<LegId, usize>,
}

impl EventData {
    /// Assemble and validate an event from its reference tables
    ///
    /// # Errors
    ///
    /// Returns `EventError::LengthMismatch` if a runner's split row does not
    /// match the length of its course, or `EventError::DanglingReference` if
    /// any identifier does not resolve.
    pub fn assemble(
        event: Event,
        groups: Vec<Group>,
        legs: Vec<LegRecord>,
        courses: Vec<Course>,
        runners: Vec<Runner>,
        splits: SplitMatrix,
        diagnostics: Vec<Diagnostic>,
    ) -> Result<Self, EventError> {
        let mut data = Self {
            version: BUNDLE_VERSION.to_string(),
            event,
            groups,
            legs,
            courses,
            runners,
            splits,
            diagnostics,
            group_index: HashMap::new(),
            runner_index: HashMap::new(),
            course_index: HashMap::new(),
            leg_index: HashMap::new(),
        };
        data.rebuild_indexes();
        data.validate()?;
        Ok(data)
    }

    /// Load a bundle from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `EventError::Io` if the file cannot be read, or any error of
    /// [`EventData::from_json`].
    pub fn load(path: &Path) -> Result<Self, EventError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a bundle from JSON and re-check its invariants
    ///
    /// # Errors
    ///
    /// Returns `EventError::Json` for malformed JSON, or a validation error.
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        let mut data: Self = serde_json::from_str(json)?;

        // Version check (warn but don't fail)
        if data.version != BUNDLE_VERSION {
            tracing::warn!(
                expected = BUNDLE_VERSION,
                found = %data.version,
                "Event bundle version mismatch"
            );
        }

        data.rebuild_indexes();
        data.validate()?;
        Ok(data)
    }

    /// # Errors
    ///
    /// Returns `EventError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, EventError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// Returns `EventError::Io` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), EventError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    fn rebuild_indexes(&mut self) {
        self.group_index = index_by(&self.groups, |g| g.id.clone());
        self.runner_index = index_by(&self.runners, |r| r.id.clone());
        self.course_index = index_by(&self.courses, |c| c.id.clone());
        self.leg_index = index_by(&self.legs, |l| l.id.clone());
    }

    fn validate(&self) -> Result<(), EventError> {
        for course in &self.courses {
            if !self.group_index.contains_key(&course.group) {
                return Err(EventError::DanglingReference(format!(
                    "course {} references unknown group {}",
                    course.id, course.group
                )));
            }
            if let Some(leg) = course.legs.iter().find(|l| !self.leg_index.contains_key(*l)) {
                return Err(EventError::DanglingReference(format!(
                    "course {} references unknown leg {leg}",
                    course.id
                )));
            }
        }

        for group in &self.groups {
            if let Some(runner) = group
                .runners
                .iter()
                .find(|r| !self.runner_index.contains_key(*r))
            {
                return Err(EventError::DanglingReference(format!(
                    "group {} references unknown runner {runner}",
                    group.id
                )));
            }
        }

        for runner in &self.runners {
            if !self.group_index.contains_key(&runner.group) {
                return Err(EventError::DanglingReference(format!(
                    "runner {} references unknown group {}",
                    runner.id, runner.group
                )));
            }
            let course = self.course(&runner.course).ok_or_else(|| {
                EventError::DanglingReference(format!(
                    "runner {} references unknown course {}",
                    runner.id, runner.course
                ))
            })?;
            let row = self.splits.row(&runner.id).ok_or_else(|| {
                EventError::DanglingReference(format!("runner {} has no split row", runner.id))
            })?;
            if row.len() != course.legs.len() {
                return Err(EventError::LengthMismatch {
                    runner: runner.id.clone(),
                    legs: course.legs.len(),
                    splits: row.len(),
                });
            }
            if !row.legs().eq(course.legs.iter()) {
                return Err(EventError::DanglingReference(format!(
                    "split row of runner {} does not follow course {}",
                    runner.id, course.id
                )));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn group(&self, id: &GroupId) -> Option<&Group> {
        self.group_index.get(id).map(|&i| &self.groups[i])
    }

    #[must_use]
    pub fn runner(&self, id: &RunnerId) -> Option<&Runner> {
        self.runner_index.get(id).map(|&i| &self.runners[i])
    }

    #[must_use]
    pub fn course(&self, id: &CourseId) -> Option<&Course> {
        self.course_index.get(id).map(|&i| &self.courses[i])
    }

    #[must_use]
    pub fn leg(&self, id: &LegId) -> Option<&LegRecord> {
        self.leg_index.get(id).map(|&i| &self.legs[i])
    }

    /// Position of a runner in event order (document order)
    #[must_use]
    pub fn runner_position(&self, id: &RunnerId) -> Option<usize> {
        self.runner_index.get(id).copied()
    }
}

fn index_by<T, K, F>(items: &[T], key: F) -> HashMap<K, usize>
where
    K: std::hash::Hash + Eq,
    F: Fn(&T) -> K,
{
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (key(item), i))
        .collect()
}
