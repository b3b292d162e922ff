//! Course model construction: deduplicating control sequences into courses
//! ([`builder`]) and turning raw parser output into the canonical
//! [`EventData`](crate::core::event::EventData) ([`assembly`]).

pub mod assembly;
pub mod builder;

pub use builder::{CourseBuilder, Dispersion};
