//! Form binding and validation. A form keeps what the user typed so it can be
//! re-rendered next to its errors when validation fails.

pub mod account;
pub mod comment;
pub mod post;

use std::collections::BTreeMap;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

/// Field name → messages. Form-wide errors use the `__all__` key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Messages for one field (owned, so templates can loop over them directly).
    pub fn for_field(&self, field: &str) -> Vec<String> {
        self.0.get(field).cloned().unwrap_or_default()
    }

    pub fn non_field(&self) -> Vec<String> {
        self.for_field("__all__")
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One `<option>` of a select, ready for the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl ToString, label: impl Into<String>, current: &str) -> Self {
        let value = value.to_string();
        let selected = value == current;
        SelectOption {
            value,
            label: label.into(),
            selected,
        }
    }
}

/// Trimmed value or a "required" error.
pub(crate) fn required(errors: &mut FormErrors, field: &str, raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        None
    } else {
        Some(value.to_string())
    }
}

pub(crate) fn max_chars(errors: &mut FormErrors, field: &str, value: &str, max: usize) -> bool {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, len
            ),
        );
        false
    } else {
        true
    }
}

/// Optional integer id: blank is `None`, garbage is an invalid choice.
pub(crate) fn optional_id(errors: &mut FormErrors, field: &str, raw: &str) -> Option<Option<i64>> {
    let value = raw.trim();
    if value.is_empty() {
        return Some(None);
    }
    match value.parse::<i64>() {
        Ok(id) => Some(Some(id)),
        Err(_) => {
            errors.add(field, INVALID_CHOICE);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_collect_per_field() {
        let mut errors = FormErrors::default();
        assert!(errors.is_empty());
        errors.add("title", "bad");
        errors.add("title", "worse");
        errors.add("__all__", "nope");
        assert_eq!(errors.for_field("title"), ["bad", "worse"]);
        assert_eq!(errors.non_field(), ["nope"]);
        assert!(errors.for_field("text").is_empty());
        assert!(errors.has("title"));
    }

    #[test]
    fn required_trims() {
        let mut errors = FormErrors::default();
        assert_eq!(required(&mut errors, "a", "  x "), Some("x".to_string()));
        assert_eq!(required(&mut errors, "b", "   "), None);
        assert_eq!(errors.for_field("b"), [REQUIRED]);
    }

    #[test]
    fn max_chars_counts_characters_not_bytes() {
        let mut errors = FormErrors::default();
        assert!(max_chars(&mut errors, "t", "привет", 6));
        assert!(!max_chars(&mut errors, "t", "привет!", 6));
    }

    #[test]
    fn optional_id_parsing() {
        let mut errors = FormErrors::default();
        assert_eq!(optional_id(&mut errors, "c", ""), Some(None));
        assert_eq!(optional_id(&mut errors, "c", "12"), Some(Some(12)));
        assert_eq!(optional_id(&mut errors, "c", "abc"), None);
        assert_eq!(errors.for_field("c"), [INVALID_CHOICE]);
    }

    #[test]
    fn select_option_marks_current() {
        assert!(SelectOption::new(3, "Three", "3").selected);
        assert!(!SelectOption::new(3, "Three", "4").selected);
    }
}
