//! Structured error types for the overlay pipeline.
//!
//! Every variant is fatal for the current run. Each carries the path, field
//! id or page index needed to diagnose it without re-running.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The unified error type returned by all public charsheet functions.
#[derive(Debug, Error)]
pub enum SheetError {
    /// The record file is missing or unreadable.
    #[error("Failed to read record {}: {source}", .path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The record file is not valid JSON, or a present field has the wrong type.
    #[error("Failed to parse record {}: {source}{}", .path.display(), format_hint(.hint))]
    InputParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// A layout slot names a field outside the record schema.
    #[error("Unknown field identity `{field}`{}", format_page(.page))]
    UnknownField { field: String, page: Option<usize> },

    /// A schema field has no slot in the layout table.
    #[error("Layout has no slot for `{field}`")]
    IncompleteLayout { field: String },

    /// A schema field has more than one slot.
    #[error("Layout places `{field}` more than once (again on page index {page})")]
    DuplicateSlot { field: String, page: usize },

    /// A slot carries a value the coordinate policy cannot use.
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Failed to read layout {}: {source}", .path.display())]
    LayoutRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse layout {}: {source}{}", .path.display(), format_hint(.hint))]
    LayoutParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    #[error("Template not found: {}", .path.display())]
    TemplateNotFound { path: PathBuf },

    #[error("Failed to read template {}: {reason}", .path.display())]
    TemplateRead { path: PathBuf, reason: String },

    /// The layout references a page the template does not have.
    #[error("Layout references page index {page} but the template has {page_count} page(s)")]
    TemplateMismatch { page: usize, page_count: usize },

    /// A single draw command could not be placed (strict draw policy only).
    #[error("Failed to draw `{field}` on page index {page}: {reason}")]
    Draw {
        page: usize,
        field: String,
        reason: String,
    },

    #[error("Failed to write output {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SheetError {
    pub(crate) fn input_parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        let hint = hint_for(&source);
        SheetError::InputParse {
            path: path.into(),
            source,
            hint,
        }
    }

    pub(crate) fn layout_parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        let hint = hint_for(&source);
        SheetError::LayoutParse {
            path: path.into(),
            source,
            hint,
        }
    }
}

fn hint_for(e: &serde_json::Error) -> String {
    match e.classify() {
        serde_json::error::Category::Syntax => {
            "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
        }
        serde_json::error::Category::Data => {
            "The JSON is valid but a field has the wrong type. Numbers must be integers, lists must be arrays.".to_string()
        }
        serde_json::error::Category::Eof => "Unexpected end of input. Is the file truncated?".to_string(),
        serde_json::error::Category::Io => String::new(),
    }
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

fn format_page(page: &Option<usize>) -> String {
    match page {
        Some(p) => format!(" on page index {}", p),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_carries_hint() {
        let source = serde_json::from_str::<serde_json::Value>("{\"name\": ").unwrap_err();
        let err = SheetError::input_parse("hero.json", source);
        let msg = err.to_string();
        assert!(msg.contains("hero.json"));
        assert!(msg.contains("Hint: Unexpected end of input"));
    }

    #[test]
    fn test_unknown_field_names_page() {
        let err = SheetError::UnknownField {
            field: "luck".to_string(),
            page: Some(1),
        };
        assert_eq!(err.to_string(), "Unknown field identity `luck` on page index 1");
    }

    #[test]
    fn test_mismatch_message() {
        let err = SheetError::TemplateMismatch { page: 2, page_count: 2 };
        assert!(err.to_string().contains("page index 2"));
        assert!(err.to_string().contains("2 page(s)"));
    }
}
