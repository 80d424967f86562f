//! Validation for rich-text input coming from the client-side editor.

use crate::error::{Error, Result};

/// Markup an empty rich-text editor submits instead of an empty string.
/// Must be treated as blank input everywhere content is validated.
pub const EMPTY_EDITOR_MARKUP: &str = "<p><br></p>";

pub const MAX_TITLE_LENGTH: usize = 100;

/// True if the submitted HTML is empty once whitespace and the empty-editor
/// sentinel are accounted for.
pub fn is_blank(html: &str) -> bool {
    let trimmed = html.trim();
    trimmed.is_empty() || trimmed == EMPTY_EDITOR_MARKUP
}

/// Validate and normalize a post title.
pub fn validate_title(raw: &str) -> Result<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(Error::Validation("Post title cannot be empty.".to_owned()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(Error::Validation(format!(
            "Post title cannot be longer than {} characters.",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(title.to_owned())
}

/// Validate rich-text body content. Returns the input trimmed.
pub fn validate_body(raw: &str, what: &str) -> Result<String> {
    if is_blank(raw) {
        return Err(Error::Validation(format!("{} cannot be empty.", what)));
    }
    Ok(raw.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_markup_is_blank() {
        assert!(is_blank(EMPTY_EDITOR_MARKUP));
        assert!(is_blank("  <p><br></p>  "));
        assert!(is_blank("   \r\n"));
        assert!(!is_blank("<p>hi</p>"));
    }

    #[test]
    fn titles_are_trimmed_and_bounded() {
        assert_eq!(validate_title("  Hello  ").unwrap(), "Hello");
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(101)).is_err());
        assert!(validate_title(&"x".repeat(100)).is_ok());
    }
}
