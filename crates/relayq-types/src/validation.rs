//! Explicit request validation rules
//!
//! Validation is rule-driven rather than reflection-driven: each request
//! type enumerates its rules in field declaration order, producing a
//! deterministic list of field/message pairs.

use crate::error::{Error, FieldError, Result};

/// Accumulates field-level failures in the order rules are applied
#[derive(Debug, Default)]
pub struct Rules {
    errors: Vec<FieldError>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// The field must be present and non-blank
    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors
                .push(FieldError::new(field, "This field is required"));
        }
        self
    }

    /// The field, when non-blank, must be one of the allowed values.
    /// Blank values are left to [`Rules::required`].
    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) -> &mut Self {
        if !value.trim().is_empty() && !allowed.contains(&value) {
            self.errors.push(FieldError::new(
                field,
                format!(
                    "Invalid value '{}'. Must be one of: {}",
                    value,
                    allowed.join(" ")
                ),
            ));
        }
        self
    }

    /// `Ok(())` when every rule passed, the collected failures otherwise
    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passing_rules() {
        let mut rules = Rules::new();
        rules.required("name", "events");
        rules.one_of("durability", "durable", &["durable", "transient"]);
        assert!(rules.finish().is_ok());
    }

    #[test]
    fn test_failures_are_collected_in_rule_order() {
        let mut rules = Rules::new();
        rules.required("name", "  ");
        rules.required("durability", "");
        let err = rules.finish().unwrap_err();

        let fields = err.field_errors();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field, "name");
        assert_eq!(fields[0].message, "This field is required");
        assert_eq!(fields[1].field, "durability");
    }

    #[test]
    fn test_one_of_rejects_unknown_value() {
        let mut rules = Rules::new();
        rules.one_of("durability", "permanent", &["durable", "transient"]);
        let err = rules.finish().unwrap_err();

        assert_eq!(
            err.field_errors()[0].message,
            "Invalid value 'permanent'. Must be one of: durable transient"
        );
    }

    #[test]
    fn test_one_of_leaves_blank_values_to_required() {
        let mut rules = Rules::new();
        rules.one_of("durability", "", &["durable", "transient"]);
        assert!(rules.finish().is_ok());
    }
}
