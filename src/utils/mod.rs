//! Shared helpers: input limits, name normalization, and geodesy.

pub mod geodesy;
pub mod validation;
