use std::fmt;
use std::path::PathBuf;

pub use efus_types::Span;
use efus_types::{line_text, LineCol};

/// File name used in diagnostics when the source did not come from a file
pub const STRING_SOURCE: &str = "<string>";

/// Errors that can occur while parsing or evaluating efus code
#[derive(Debug, thiserror::Error)]
pub enum EfusError {
    #[error("{message}\n{location}")]
    Syntax {
        message: String,
        location: Box<SourceLocation>,
    },

    #[error("name `{name}` is not defined")]
    NameNotFound { name: String },

    #[error("component not found: `{name}`")]
    ComponentNotFound { name: String },

    #[error("`{name}` is {kind}, not a component factory")]
    NotAComponent { name: String, kind: &'static str },

    #[error("circular namespace parents while resolving `{name}`")]
    CircularNamespace { name: String },

    #[error("component `{component}` has no parameter `{name}`")]
    Binding { component: String, name: String },

    #[error("cannot cast {value} to {target}")]
    Cast {
        value: String,
        target: String,
        #[source]
        cause: Option<Box<EfusError>>,
    },

    #[error("component `{component}` prerender produced no handle")]
    RenderInvariant { component: String },

    #[error("namespace notifications nested deeper than {depth} levels")]
    NotificationLoop { depth: usize },

    #[error("component `{component}` hook re-entered while it was running")]
    Reentrant { component: String },

    #[error("cannot import from `{module}`: {message}")]
    Import { module: String, message: String },

    #[error("invalid YAML block: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("expression `{expression}` failed: {message}")]
    Expr { expression: String, message: String },

    #[error("string formatting failed: {message}")]
    Format { message: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, EfusError>;

impl EfusError {
    pub fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        EfusError::Syntax {
            message: message.into(),
            location: Box::new(location),
        }
    }

    pub fn cast(value: impl fmt::Display, target: impl fmt::Display) -> Self {
        EfusError::Cast {
            value: value.to_string(),
            target: target.to_string(),
            cause: None,
        }
    }

    /// Source position, for errors raised by the parser
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            EfusError::Syntax { location, .. } => Some(location),
            _ => None,
        }
    }

    /// Short message without the positional diagram
    pub fn summary(&self) -> String {
        match self {
            EfusError::Syntax { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Position of a syntax error, rendered as a compiler-style diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    /// 1-based
    pub line: usize,
    /// 0-based
    pub column: usize,
    pub source_line: String,
}

impl SourceLocation {
    pub fn new(file: Option<&str>, source: &str, offset: usize) -> Self {
        let pos = LineCol::locate(source, offset);
        Self {
            file: file.unwrap_or(STRING_SOURCE).to_string(),
            line: pos.line,
            column: pos.column,
            source_line: line_text(source, offset).to_string(),
        }
    }

    pub fn line_col(&self) -> LineCol {
        LineCol {
            line: self.line,
            column: self.column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  File \"{}\", line {}, column {}",
            self.file, self.line, self.column
        )?;
        writeln!(f, "  {}", self.source_line)?;
        write!(f, "  {}^", " ".repeat(self.column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_offset() {
        let source = "box\n  label text=?\n";
        let loc = SourceLocation::new(None, source, 17);
        assert_eq!(loc.file, STRING_SOURCE);
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 13);
        assert_eq!(loc.source_line, "  label text=?");
    }

    #[test]
    fn test_syntax_error_display() {
        let loc = SourceLocation::new(Some("page.efus"), "box width=?", 10);
        let err = EfusError::syntax("Unknown literal", loc);
        insta::assert_snapshot!(err.to_string(), @r#"
        Unknown literal
          File "page.efus", line 1, column 10
          box width=?
                    ^
        "#);
        assert_eq!(err.summary(), "Unknown literal");
    }

    #[test]
    fn test_cast_error_message() {
        let err = EfusError::cast("\"abc\"", "Number");
        assert_eq!(err.to_string(), "cannot cast \"abc\" to Number");
        assert!(err.location().is_none());
    }
}
