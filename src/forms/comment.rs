use serde::Deserialize;

use crate::forms::{required, FormErrors};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
    #[serde(skip)]
    pub errors: FormErrors,
}

impl CommentForm {
    pub fn with_text(text: &str) -> Self {
        CommentForm {
            text: text.to_string(),
            errors: FormErrors::default(),
        }
    }

    /// Trimmed comment text, or `None` with errors recorded on the form.
    pub fn validate(&mut self) -> Option<String> {
        let mut errors = FormErrors::default();
        let text = required(&mut errors, "text", &self.text);
        self.errors = errors;
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_comment_rejected() {
        let mut form = CommentForm::with_text("   ");
        assert!(form.validate().is_none());
        assert!(form.errors.has("text"));
    }

    #[test]
    fn comment_trimmed() {
        let mut form = CommentForm::with_text("  nice post\n");
        assert_eq!(form.validate().as_deref(), Some("nice post"));
        assert!(form.errors.is_empty());
    }
}
