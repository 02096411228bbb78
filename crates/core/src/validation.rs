use thiserror::Error;

pub const MAX_MESSAGE_LEN: usize = 4_000;
pub const MAX_POST_CONTENT_LEN: usize = 8_000;
pub const MAX_SUGGESTION_LEN: usize = 4_000;
pub const MAX_POLICY_TITLE_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    Missing(&'static str),
    #[error("field {field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("unknown emotion_id: {0}")]
    UnknownEmotion(i64),
}

/// Returns the trimmed value, rejecting absent or blank input.
pub fn require_text<'a>(
    field: &'static str,
    value: Option<&'a str>,
    max: usize,
) -> Result<&'a str, ValidationError> {
    let value = value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::Missing(field))?;

    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }

    Ok(value)
}

pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) if value.chars().count() > max => {
            Err(ValidationError::TooLong { field, max })
        }
        Some(value) => Ok(Some(value.to_string())),
        None => Ok(None),
    }
}
