use serde::{Deserialize, Serialize};

/// Elapsed time in whole seconds
pub type Seconds = u32;

/// Finish result assigned to runners without a recognizable finish time (100 hours)
pub const DNF_SECONDS: Seconds = 360_000;

/// Control code that opens every course
pub const START_CODE: u32 = 241;

/// Control code that closes every course
pub const FINISH_CODE: u32 = 240;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Group identifier: the upper-cased group name (e.g. `M21`)
    GroupId
);
string_id!(
    /// Runner identifier: `<DISPLAY NAME>^<GROUP>`, unique within the event
    RunnerId
);
string_id!(
    /// Course identifier: `<GROUP>#<n>`
    CourseId
);
string_id!(
    /// Leg identifier: `<start>-<end>`, or `<start>-<end>@<GROUP>` for legs
    /// between ordinal controls, which only mean something within their group
    LegId
);

/// The timed segment between two consecutive controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Leg {
    pub start: u32,
    pub end: u32,
}

impl Leg {
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn id(&self) -> LegId {
        LegId(format!("{}-{}", self.start, self.end))
    }

    /// Identifier of a leg whose codes are ordinals local to `group`
    #[must_use]
    pub fn scoped_id(&self, group: &GroupId) -> LegId {
        LegId(format!("{}-{}@{group}", self.start, self.end))
    }

    /// Pair up consecutive control codes into legs
    #[must_use]
    pub fn chain(codes: &[u32]) -> Vec<Leg> {
        codes.windows(2).map(|w| Leg::new(w[0], w[1])).collect()
    }

    /// Build a course from the intermediate controls, adding the start and finish sentinels
    #[must_use]
    pub fn bounded_chain(controls: &[u32]) -> Vec<Leg> {
        let mut codes = Vec::with_capacity(controls.len() + 2);
        codes.push(START_CODE);
        codes.extend_from_slice(controls);
        codes.push(FINISH_CODE);
        Self::chain(&codes)
    }
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.start, self.end)
    }
}

/// State of one (runner, leg) cell of the split matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitCell {
    /// A valid leg time
    Time(Seconds),
    /// The leg is on the runner's course but no valid time could be derived
    Missing,
    /// The leg is not on the runner's course
    NotApplicable,
}

impl SplitCell {
    #[must_use]
    pub fn seconds(self) -> Option<Seconds> {
        match self {
            Self::Time(s) => Some(s),
            Self::Missing | Self::NotApplicable => None,
        }
    }
}

/// A record skipped during parsing, with the reason it was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Group, runner, line, or person the record belonged to
    pub record: String,
    pub reason: String,
}

impl Diagnostic {
    pub fn new(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.record, self.reason)
    }
}

/// Format a duration in seconds as `H:MM:SS`
#[must_use]
pub fn format_seconds(seconds: Seconds) -> String {
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
