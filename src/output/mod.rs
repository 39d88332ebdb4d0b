//! Report formatters.
//!
//! - [`text`] for terminals
//! - [`json`] for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use dupsift::duplicates::DuplicateFinder;
//! use dupsift::error::ExitCode;
//! use dupsift::output::json::JsonOutput;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let report = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! let output = JsonOutput::new(&report, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::JsonOutput;
pub use text::TextReport;
