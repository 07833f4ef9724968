use thiserror::Error;

/// Minimum meaningful input.
pub const MIN_INPUT_CHARS: usize = 3;
/// Approximate character limit for a 512-token sequence (4 chars/token);
/// the tokenizer still truncates anything that slips past this check.
pub const MAX_INPUT_CHARS: usize = 2048;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("text must be at least {} characters long", MIN_INPUT_CHARS)]
    TooShort,
    #[error("text cannot be empty or whitespace only")]
    Empty,
    #[error("text must be at most {} characters long", MAX_INPUT_CHARS)]
    TooLong,
}

/// Cheap gate applied before any model work. Trims the input, enforces the
/// length bounds (counted in characters, not bytes) and returns the trimmed
/// text.
pub fn validate(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();

    if trimmed.chars().count() < MIN_INPUT_CHARS {
        return Err(ValidationError::TooShort);
    }

    if trimmed.is_empty() || trimmed.chars().all(char::is_whitespace) {
        return Err(ValidationError::Empty);
    }

    // The bound applies to the original input, before trimming.
    if text.chars().count() > MAX_INPUT_CHARS {
        return Err(ValidationError::TooLong);
    }

    Ok(trimmed.to_string())
}
