//! Command line front end for ebmacro.

pub mod cli;
pub mod logger;
pub mod taglist;
