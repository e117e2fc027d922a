use std::fmt;

/// A single structural problem found while building the IR.
///
/// `location` follows `"schema:User"` for schemas and `"{path} → {METHOD}"` for
/// operations, `kind` is a stable snake_case category for filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub location: String,
    pub kind: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        location: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            location: location.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

/// Fatal IR construction failure.
///
/// Raised before any generator runs, so a malformed document never produces
/// partial output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// The document is not an object or lacks a mandatory section
    Malformed {
        /// What was expected
        message: String,
    },
    /// One or more operations or schemas violate generation rules
    Invalid {
        /// Every offending field, in document order
        issues: Vec<ValidationIssue>,
    },
}

impl SpecError {
    /// Issues carried by this error, empty for [`SpecError::Malformed`].
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            SpecError::Malformed { .. } => &[],
            SpecError::Invalid { issues } => issues,
        }
    }
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecError::Malformed { message } => write!(f, "malformed OpenAPI document: {message}"),
            SpecError::Invalid { issues } => {
                write!(f, "OpenAPI document failed validation with {} issue(s)", issues.len())?;
                for issue in issues {
                    write!(f, "\n  {issue}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SpecError {}
