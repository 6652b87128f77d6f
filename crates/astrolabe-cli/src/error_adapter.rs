//! Error adapter for converting AstrolabeError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.
//!
//! # Multi-Error Support
//!
//! When a diagram is rejected for its structural violations, each
//! [`Violation`] is rendered independently, with its rule code.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan};

use astrolabe::{AstrolabeError, DeserializationError, validation::Violation};

/// Adapter for a single structural violation.
#[derive(Debug)]
pub struct ViolationAdapter<'a>(pub &'a Violation);

impl fmt::Display for ViolationAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.message())
    }
}

impl std::error::Error for ViolationAdapter<'_> {}

impl MietteDiagnostic for ViolationAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.0.code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("offending element: {}", self.0.element())))
    }
}

/// Adapter for [`AstrolabeError`] variants without per-item detail.
pub struct ErrorAdapter<'a>(pub &'a AstrolabeError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            AstrolabeError::Io(_) => "astrolabe::io",
            AstrolabeError::Graph(_) => "astrolabe::graph",
            AstrolabeError::Deserialization(_) => "astrolabe::deserialization",
            AstrolabeError::UnsupportedKind { .. } => "astrolabe::unsupported_kind",
            AstrolabeError::Config(_) => "astrolabe::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.0 {
            AstrolabeError::Config(_) => Some(Box::new(
                "pass --config with a valid TOML file, or remove the broken one",
            )),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// A reportable error that can be rendered by miette.
///
/// This enum wraps either a single violation or a whole error, providing a
/// uniform interface for error rendering.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// One broken structural rule of a rejected diagram.
    Violation(ViolationAdapter<'a>),
    /// Any other error.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Violation(v) => fmt::Display::fmt(v, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Violation(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Violation(v) => v.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Violation(v) => v.help(),
            Reportable::Error(e) => e.help(),
        }
    }
}

/// Convert an [`AstrolabeError`] into a list of reportable errors.
///
/// A diagram rejected for its violations yields one [`Reportable`] per
/// violation. Other errors yield a single [`Reportable`].
pub fn to_reportables(err: &AstrolabeError) -> Vec<Reportable<'_>> {
    match err {
        AstrolabeError::Deserialization(DeserializationError::Invalid(violations))
            if !violations.is_empty() =>
        {
            violations
                .iter()
                .map(|v| Reportable::Violation(ViolationAdapter(v)))
                .collect()
        }
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}
