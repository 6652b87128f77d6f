//! CLI logic for the Astrolabe diagram checker.
//!
//! This module loads a JSON diagram, validates it against the rules of its
//! diagram type and writes a structural report.

pub mod error_adapter;

mod args;
mod config;
mod report;

pub use args::Args;
pub use report::Report;

use std::{fs, io::Write};

use log::{info, warn};

use astrolabe::{AstrolabeError, EditingSession, persistence};

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Number of structural violations found in the diagram.
    pub violations: usize,
}

impl Outcome {
    /// Checks whether the diagram passed validation.
    pub fn is_valid(&self) -> bool {
        self.violations == 0
    }
}

/// Run the Astrolabe CLI application
///
/// The diagram is decoded without load-time rejection, so that its
/// violations end up in the report rather than in an error.
///
/// # Errors
///
/// Returns `AstrolabeError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Diagrams that cannot be decoded
pub fn run(args: &Args) -> Result<Outcome, AstrolabeError> {
    info!(
        input_path = args.input,
        output_path = args.output.as_deref().unwrap_or("-");
        "Checking diagram"
    );

    let app_config = config::load_config(args.config.as_ref())?;

    let source = fs::read_to_string(&args.input)?;
    let diagram = persistence::from_str(&source)?;
    let session = EditingSession::from_diagram(diagram, app_config);

    let report = Report::new(&session);
    let violations = report.violations().len();
    let text = report.to_string();

    match &args.output {
        Some(path) => {
            fs::write(path, text)?;
            info!(output_file = path; "Report written");
        }
        None => std::io::stdout().write_all(text.as_bytes())?,
    }

    if violations > 0 {
        warn!(violations = violations; "Diagram has structural violations");
    }
    Ok(Outcome { violations })
}
