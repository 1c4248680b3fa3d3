use thiserror::Error;

/// Shortest prompt the generator is asked to work with.
pub const MIN_PROMPT_CHARS: usize = 10;
/// Longest prompt accepted on the shared key.
pub const MAX_PROMPT_CHARS: usize = 240;

const FORBIDDEN_CHARS: [char; 3] = ['"', '\'', '\\'];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("prompt has {len} characters, at least {MIN_PROMPT_CHARS} are required")]
    TooShort { len: usize },

    #[error("prompt has {len} characters, at most {MAX_PROMPT_CHARS} are allowed")]
    TooLong { len: usize },
}

/// A prompt that has been trimmed, stripped of quote/backslash characters and length-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl std::fmt::Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sanitize a raw prompt: trim, strip forbidden characters, then validate length.
///
/// `elevated` is true when the caller supplied their own credential; it lifts the
/// upper length cap entirely.
pub fn sanitize(raw: &str, elevated: bool) -> Result<Prompt, ValidationError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c))
        .collect();
    // Removing characters can expose inner whitespace at the edges.
    let cleaned = cleaned.trim().to_string();

    let len = cleaned.chars().count();
    if len == 0 {
        return Err(ValidationError::EmptyPrompt);
    }
    if len < MIN_PROMPT_CHARS {
        return Err(ValidationError::TooShort { len });
    }
    if len > MAX_PROMPT_CHARS && !elevated {
        return Err(ValidationError::TooLong { len });
    }

    Ok(Prompt(cleaned))
}
