//! Field-scoped validation errors.
//!
//! Request payloads declare their rules with `#[derive(validator::Validate)]`.
//! `validator` reports every failing field at once in a hash map; this module
//! turns that report into a stable, ordered list that can be sent back to the
//! client verbatim.

use core::fmt;

use serde::Serialize;
use validator::ValidationErrors;

/// A single failed rule on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending field as it appears in the JSON payload.
    pub field: String,
    /// Human readable description of the violated constraint.
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All validation failures for one candidate entity.
///
/// Displays like a document-schema error when an entity name is set
/// (`"Product validation failed: price: Price cannot be negative"`), and as
/// the bare list of messages otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    entity: Option<&'static str>,
    errors: Vec<FieldError>,
}

impl ValidationFailure {
    /// Build a failure from already ordered field errors.
    #[must_use]
    pub const fn new(entity: Option<&'static str>, errors: Vec<FieldError>) -> Self {
        Self { entity, errors }
    }

    /// Convert a `validator` report, ordering fields as listed in
    /// `field_order`. Fields missing from `field_order` sort last, by name.
    #[must_use]
    pub fn from_report(
        entity: Option<&'static str>,
        report: &ValidationErrors,
        field_order: &[&str],
    ) -> Self {
        let mut fields: Vec<(usize, String, Vec<String>)> = report
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let field = field.to_string();
                let rank = field_order
                    .iter()
                    .position(|known| *known == field)
                    .unwrap_or(usize::MAX);
                let messages = errors
                    .iter()
                    .map(|error| {
                        error
                            .message
                            .as_ref()
                            .map_or_else(|| error.code.to_string(), ToString::to_string)
                    })
                    .collect();
                (rank, field, messages)
            })
            .collect();

        fields.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let mut errors = Vec::new();
        for (_, field, messages) in fields {
            let mut seen: Vec<String> = Vec::new();
            for message in messages {
                // `required` and `length(min = 1)` share a message on some fields
                if !seen.contains(&message) {
                    seen.push(message.clone());
                    errors.push(FieldError::new(field.clone(), message));
                }
            }
        }

        Self::new(entity, errors)
    }

    /// The individual field errors, in report order.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether a given field has at least one error.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(entity) = self.entity {
            write!(f, "{entity} validation failed: ")?;
            for (i, error) in self.errors.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}: {}", error.field, error.message)?;
            }
            Ok(())
        } else {
            for (i, error) in self.errors.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(&error.message)?;
            }
            Ok(())
        }
    }
}

impl std::error::Error for ValidationFailure {}
