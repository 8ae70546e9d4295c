// 📐 Shape Layer - Field validation
// Required fields, max lengths, and numeric ranges for every command

use rust_decimal::Decimal;
use std::fmt::Display;

/// Upper bound for any money, quantity, or odometer field
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Finest precision accepted for those fields
pub const MAX_SCALE: u32 = 4;

/// `None` if the total overflows
pub fn checked_sum<I: IntoIterator<Item = Decimal>>(values: I) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
}

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub context: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.context, self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Implemented by every create/update command.
pub trait Validate {
    fn validate(&self) -> ValidationResult;
}

// ============================================================================
// VALIDATOR
// ============================================================================

/// Collects every failing rule for one command instead of stopping at the
/// first one.
pub struct Validator {
    context: &'static str,
    errors: Vec<ValidationError>,
}

impl Validator {
    pub fn new(context: &'static str) -> Self {
        Validator {
            context,
            errors: Vec::new(),
        }
    }

    fn push(&mut self, field: &str, message: String) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message,
            context: self.context.to_string(),
        });
    }

    /// Non-blank string
    pub fn required(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.push(field, "Required field is empty".to_string());
        }
        self
    }

    /// Length in characters, not bytes
    pub fn max_len(mut self, field: &str, value: &str, max: usize) -> Self {
        let len = value.chars().count();
        if len > max {
            self.push(field, format!("Must be at most {} characters, got {}", max, len));
        }
        self
    }

    pub fn max_len_opt(self, field: &str, value: Option<&str>, max: usize) -> Self {
        match value {
            Some(v) => self.max_len(field, v, max),
            None => self,
        }
    }

    pub fn range<T: PartialOrd + Display>(mut self, field: &str, value: T, min: T, max: T) -> Self {
        if value < min || value > max {
            self.push(field, format!("Must be between {} and {}, got {}", min, max, value));
        }
        self
    }

    pub fn range_opt<T: PartialOrd + Display>(self, field: &str, value: Option<T>, min: T, max: T) -> Self {
        match value {
            Some(v) => self.range(field, v, min, max),
            None => self,
        }
    }

    /// Money, quantities, odometers: 0 ..= `MAX_AMOUNT`, at most `MAX_SCALE`
    /// decimal places. Keeps every derived total and ratio in range.
    pub fn amount(mut self, field: &str, value: Decimal) -> Self {
        if value.is_sign_negative() && !value.is_zero() {
            self.push(field, format!("Must not be negative, got {}", value));
        } else if value > Decimal::from(MAX_AMOUNT) {
            self.push(field, format!("Must be at most {}, got {}", MAX_AMOUNT, value));
        } else if value.normalize().scale() > MAX_SCALE {
            self.push(field, format!("Must have at most {} decimal places, got {}", MAX_SCALE, value));
        }
        self
    }

    pub fn amount_opt(self, field: &str, value: Option<Decimal>) -> Self {
        match value {
            Some(v) => self.amount(field, v),
            None => self,
        }
    }

    /// Arbitrary rule; `ok == false` records `message` against `field`
    pub fn check(mut self, ok: bool, field: &str, message: &str) -> Self {
        if !ok {
            self.push(field, message.to_string());
        }
        self
    }

    pub fn finish(self) -> ValidationResult {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_valid_input_passes() {
        let result = Validator::new("Wine")
            .required("name", "Château Margaux")
            .max_len("name", "Château Margaux", 200)
            .range("rating", 95, 0, 100)
            .amount("price", dec!(450.00))
            .finish();

        assert!(result.is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let result = Validator::new("Wine")
            .required("name", "   ")
            .range("rating", 120, 0, 100)
            .amount("price", dec!(-1))
            .finish();

        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].field, "name");
        assert_eq!(errors[1].field, "rating");
        assert_eq!(errors[2].field, "price");
        assert!(errors.iter().all(|e| e.context == "Wine"));
    }

    #[test]
    fn test_max_len_counts_characters() {
        // 5 chars, 6 bytes
        let ok = Validator::new("Test").max_len("name", "Rosé!", 5).finish();
        assert!(ok.is_ok());

        let too_long = Validator::new("Test").max_len("name", "abcdef", 5).finish();
        assert!(too_long.is_err());
    }

    #[test]
    fn test_optional_rules_skip_none() {
        let result = Validator::new("Test")
            .max_len_opt("notes", None, 1)
            .range_opt::<i32>("pulse", None, 20, 250)
            .amount_opt("price", None)
            .finish();

        assert!(result.is_ok());
    }

    #[test]
    fn test_zero_is_not_negative() {
        assert!(Validator::new("Test").amount("amount", dec!(0)).finish().is_ok());
        assert!(Validator::new("Test").amount("amount", dec!(-0.00)).finish().is_ok());
    }

    #[test]
    fn test_amount_bounds_magnitude_and_precision() {
        let ok = Validator::new("Test")
            .amount("price", dec!(1000000000000))
            .amount("gallons", dec!(12.3450))
            .finish();
        assert!(ok.is_ok());

        let errors = Validator::new("Test")
            .amount("price", dec!(79228162514264337593543950335))
            .amount("gallons", dec!(0.00001))
            .finish()
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.starts_with("Must be at most"));
        assert!(errors[1].message.contains("decimal places"));
    }

    #[test]
    fn test_checked_sum_reports_overflow() {
        assert_eq!(checked_sum([dec!(1.5), dec!(2.25)]), Some(dec!(3.75)));
        assert_eq!(checked_sum(Vec::new()), Some(Decimal::ZERO));
        assert_eq!(checked_sum([Decimal::MAX, Decimal::ONE]), None);
    }

    #[test]
    fn test_display_format() {
        let err = ValidationError {
            field: "systolic".to_string(),
            message: "Must be between 40 and 300, got 20".to_string(),
            context: "Reading".to_string(),
        };
        assert_eq!(err.to_string(), "[Reading] systolic: Must be between 40 and 300, got 20");
    }
}
