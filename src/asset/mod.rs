//! Asset selection module
//!
//! Reduces the assets of one release to the artifact that fits this system.
//! Ambiguity is returned to the caller as [`Candidates::Ambiguous`]; the filter
//! never guesses between equally valid files.

mod filter;

pub use filter::{CandidateFilter, Candidates, PACKAGE_SUFFIX};
