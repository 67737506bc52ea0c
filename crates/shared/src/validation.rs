//! Validation rules for member addresses.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

/// The 50 US states plus DC.
pub const US_STATE_CODES: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA", "KS",
    "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM", "NY",
    "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA", "WV",
    "WI", "WY", "DC",
];

lazy_static! {
    static ref CITY_PATTERN: Regex = Regex::new(r"^[A-Za-z][A-Za-z .'-]{1,79}$").unwrap();
    static ref POSTAL_PATTERN: Regex = Regex::new(r"^\d{5}(?:-\d{4})?$").unwrap();
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

pub fn validate_address_line1(line1: &str) -> Result<(), ValidationError> {
    if line1.trim().is_empty() {
        return Err(error("address_line1", "Address line 1 is required."));
    }
    Ok(())
}

pub fn validate_city(city: &str) -> Result<(), ValidationError> {
    if city.is_empty() || !CITY_PATTERN.is_match(city) {
        return Err(error(
            "city",
            "City is required and must be a valid city name.",
        ));
    }
    Ok(())
}

/// Expects an already uppercased code.
pub fn validate_state_code(state: &str) -> Result<(), ValidationError> {
    if !US_STATE_CODES.contains(&state) {
        return Err(error(
            "state",
            "State must be a valid 2-letter US state code.",
        ));
    }
    Ok(())
}

pub fn validate_postal_code(postal_code: &str) -> Result<(), ValidationError> {
    if !POSTAL_PATTERN.is_match(postal_code) {
        return Err(error(
            "postal_code",
            "Postal code must be a valid US ZIP code.",
        ));
    }
    Ok(())
}

/// Message attached to a validation error, or its code when none was set.
pub fn error_message(err: &ValidationError) -> String {
    err.message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| err.code.to_string())
}
