//! Library side of the `edflow` command-line tool.

pub mod input;
pub mod logging;
