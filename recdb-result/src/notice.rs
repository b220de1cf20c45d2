//! Leveled, non-fatal reports returned alongside successful statements.

use std::fmt;

use crate::error::ErrorCategory;

/// Severity of a [`Notice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeLevel::Warning => f.write_str("WARNING"),
        }
    }
}

/// A condition worth reporting that did not abort the statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub category: ErrorCategory,
    pub message: String,
}

impl Notice {
    pub fn warning(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            category,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.level, self.message, self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_display_includes_level_and_category() {
        let notice = Notice::warning(
            ErrorCategory::InvalidSchemaName,
            "failed to find cells for recommender movies",
        );
        assert_eq!(
            notice.to_string(),
            "WARNING: failed to find cells for recommender movies (invalid_schema_name)"
        );
    }
}
