// ABOUTME: Error types for the migration toolkit including ErrorCode enum and MigrateError struct.
// ABOUTME: Provides categorized errors with convenience constructors and boolean helpers.

use std::fmt;

/// Error codes representing different categories of migration failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A required environment value is missing or malformed.
    Config,
    /// An expected reference document was not found.
    Lookup,
    /// Reading from the content store failed.
    Fetch,
    /// Writing to the content store failed.
    Write,
    /// A fetched document does not match the expected shape.
    Decode,
    /// Local input (HTML file, pattern file, selector) could not be used.
    Input,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::Config => "configuration error",
            ErrorCode::Lookup => "lookup failed",
            ErrorCode::Fetch => "fetch error",
            ErrorCode::Write => "write error",
            ErrorCode::Decode => "decode error",
            ErrorCode::Input => "invalid input",
        };
        write!(f, "{}", s)
    }
}

/// The main error type for migration operations.
#[derive(Debug, thiserror::Error)]
pub struct MigrateError {
    pub code: ErrorCode,
    pub op: String,
    pub target: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for MigrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "migrate: {}", self.op)?;
        if !self.target.is_empty() {
            write!(f, " {}", self.target)?;
        }
        write!(f, ": {}", self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl MigrateError {
    fn new(
        code: ErrorCode,
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            op: op.into(),
            target: target.into(),
            source,
        }
    }

    /// Create a Config error.
    pub fn config(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Config, target, op, source)
    }

    /// Create a Lookup error.
    pub fn lookup(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Lookup, target, op, source)
    }

    /// Create a Fetch error.
    pub fn fetch(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Fetch, target, op, source)
    }

    /// Create a Write error.
    pub fn write(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Write, target, op, source)
    }

    /// Create a Decode error.
    pub fn decode(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Decode, target, op, source)
    }

    /// Create an Input error.
    pub fn input(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Input, target, op, source)
    }

    /// Returns true if this is a Config error.
    pub fn is_config(&self) -> bool {
        self.code == ErrorCode::Config
    }

    /// Returns true if this is a Lookup error.
    pub fn is_lookup(&self) -> bool {
        self.code == ErrorCode::Lookup
    }

    /// Returns true if this is a Fetch error.
    pub fn is_fetch(&self) -> bool {
        self.code == ErrorCode::Fetch
    }

    /// Returns true if this is a Write error.
    pub fn is_write(&self) -> bool {
        self.code == ErrorCode::Write
    }

    /// Returns true if this is a Decode error.
    pub fn is_decode(&self) -> bool {
        self.code == ErrorCode::Decode
    }

    /// Returns true if this is an Input error.
    pub fn is_input(&self) -> bool {
        self.code == ErrorCode::Input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_op_target_and_code() {
        let err = MigrateError::write("drafts.a", "Delete", Some(anyhow::anyhow!("HTTP 500")));
        assert_eq!(err.to_string(), "migrate: Delete drafts.a: write error: HTTP 500");
        assert!(err.is_write());
    }

    #[test]
    fn display_omits_empty_target() {
        let err = MigrateError::config("", "LoadConfig", None);
        assert_eq!(err.to_string(), "migrate: LoadConfig: configuration error");
        assert!(err.is_config());
    }

    #[test]
    fn input_errors_have_their_own_helper() {
        let err = MigrateError::input("main", "SelectContainer", None);
        assert!(err.is_input());
        assert!(!err.is_config());
        assert!(!MigrateError::decode("p1", "DecodeDocument", None).is_input());
    }
}
