//! Registration forms and step-by-step wizards.
//!
//! Forms hold raw operator input as strings. `update` only records a value;
//! `validate` reports every problem at once so the caller can show them
//! next to the inputs. `build` turns a valid form into a domain record.

mod account;
mod address;
mod error;
mod generator;
mod subscriber;
mod wizard;

pub use account::{AdministratorForm, EnergyAccountForm};
pub use address::AddressForm;
pub use error::{FieldError, FormError};
pub use generator::GeneratorForm;
pub use subscriber::SubscriberForm;
pub use wizard::{Wizard, WizardForm};

use std::str::FromStr;

/// Common surface of every form.
pub trait FormState {
    /// Names accepted by [`FormState::update`].
    fn fields(&self) -> &'static [&'static str];

    /// Record a raw value for a field.
    fn update(&mut self, field: &str, value: &str) -> Result<(), FormError>;

    /// Current raw value of a field.
    fn value(&self, field: &str) -> Option<&str>;

    /// Every problem with the current input.
    fn validate(&self) -> Vec<FieldError>;
}

pub(crate) fn required(errors: &mut Vec<FieldError>, field: &str, value: &str, label: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, format!("{} is required", label)));
    }
}

/// Validate a value that must parse when present.
pub(crate) fn parsed<T: FromStr>(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: &str,
    required: bool,
) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    let value = value.trim();
    if value.is_empty() {
        if required {
            errors.push(FieldError::new(field, "is required"));
        }
        return None;
    }
    match value.parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            errors.push(FieldError::new(field, e.to_string()));
            None
        }
    }
}

/// Parse a decimal typed with either `.` or `,` as separator.
pub(crate) fn parse_decimal(value: &str) -> Result<f64, String> {
    let normalized = value.trim().replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("'{}' is not a number", value.trim()))
}

pub fn is_plausible_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((user, domain)) => {
            !user.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

pub(crate) fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
