//! Core data types for split-time analysis.
//!
//! - [`types`]: identifiers, legs, split cells and diagnostics
//! - [`event`]: the canonical event bundle and its split matrix
//!
//! ## Identifiers
//!
//! Every identifier is derived from content, so re-parsing the same export
//! yields the same ids:
//!
//! | Entity | Form | Example |
//! |--------|------|---------|
//! | Group  | upper-cased name | `M21` |
//! | Runner | `NAME^GROUP` | `DOE JOHN^M21` |
//! | Course | `GROUP#n` | `M21#2` |
//! | Leg    | `start-end` | `241-31` |

pub mod event;
pub mod types;
