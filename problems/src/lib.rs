//! Problem codes for configuration errors.
//!
//! The enumeration is generated from `resources/problem-codes.csv` so that
//! codes stay stable and messages live in one place.

use std::fmt;

include!(concat!(env!("OUT_DIR"), "/problems.rs"));

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}
