//! Step catalogue: labels, default templates and required fields.
//!
//! Defaults are a pure function of the step. Loading a step whose slice has
//! never been written yields the same form as loading that step on a fresh
//! record.

use serde::Serialize;
use serde_json::{json, Value};
use validator::ValidateEmail;

use crate::error::{CoreError, FieldErrors};
use crate::slices::{merge_fields, SliceName};
use crate::types::JsonMap;

/// Total number of numbered steps in the wizard (the summary is not one).
pub const TOTAL_STEPS: u8 = 7;

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

/// Maximum step number (1-based).
pub const MAX_STEP: u8 = TOTAL_STEPS;

/// Weekdays used by the default opening-hours template.
const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

// ---------------------------------------------------------------------------
// Required fields
// ---------------------------------------------------------------------------

/// How a required field decides whether it has been filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRule {
    /// A non-blank string or any number.
    Text,
    /// A non-blank string that parses as an email address.
    Email,
    /// A non-empty list.
    List,
    /// Must be exactly `true`.
    Accepted,
    /// A whole number greater than zero.
    Count,
}

/// A field that must be filled in before leaving its step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequiredField {
    pub key: &'static str,
    pub label: &'static str,
    pub rule: FieldRule,
}

const fn required(key: &'static str, label: &'static str, rule: FieldRule) -> RequiredField {
    RequiredField { key, label, rule }
}

const RESTAURANT_REQUIRED: &[RequiredField] = &[
    required("name", "Restaurant name", FieldRule::Text),
    required("street", "Street", FieldRule::Text),
    required("zipCode", "ZIP code", FieldRule::Text),
    required("city", "City", FieldRule::Text),
];

const CONTACT_REQUIRED: &[RequiredField] = &[
    required("firstName", "First name", FieldRule::Text),
    required("lastName", "Last name", FieldRule::Text),
    required("email", "Email", FieldRule::Email),
    required("phone", "Phone", FieldRule::Text),
];

const BUSINESS_REQUIRED: &[RequiredField] = &[
    required("legalName", "Legal name", FieldRule::Text),
    required("taxId", "Tax ID", FieldRule::Text),
    required("iban", "IBAN", FieldRule::Text),
];

const TABLES_REQUIRED: &[RequiredField] = &[required(
    "indoorTables",
    "Indoor tables",
    FieldRule::Count,
)];

const MENU_REQUIRED: &[RequiredField] = &[required(
    "categories",
    "Menu categories",
    FieldRule::List,
)];

const AGREEMENT_REQUIRED: &[RequiredField] = &[
    required("signatoryName", "Signatory name", FieldRule::Text),
    required("signature", "Signature", FieldRule::Text),
    required("acceptedTerms", "Terms accepted", FieldRule::Accepted),
];

/// Required fields for a slice's step.
pub fn required_fields(slice: SliceName) -> &'static [RequiredField] {
    match slice {
        SliceName::RestaurantInfo => RESTAURANT_REQUIRED,
        SliceName::Contact => CONTACT_REQUIRED,
        SliceName::BusinessData => BUSINESS_REQUIRED,
        SliceName::TechSetup => &[],
        SliceName::Tables => TABLES_REQUIRED,
        SliceName::Menu => MENU_REQUIRED,
        SliceName::Agreement => AGREEMENT_REQUIRED,
    }
}

/// Human-readable label for the step editing `slice`.
pub fn label(slice: SliceName) -> &'static str {
    match slice {
        SliceName::RestaurantInfo => "Restaurant",
        SliceName::Contact => "Contact",
        SliceName::BusinessData => "Business data",
        SliceName::TechSetup => "Tech setup",
        SliceName::Tables => "Tables",
        SliceName::Menu => "Menu",
        SliceName::Agreement => "Agreement",
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_opening_hours() -> Value {
    let mut week = JsonMap::new();
    for day in WEEKDAYS {
        week.insert(
            day.to_string(),
            json!({ "open": "11:30", "close": "22:00", "closed": false }),
        );
    }
    Value::Object(week)
}

/// Default template for a slice.
pub fn defaults(slice: SliceName) -> JsonMap {
    let value = match slice {
        SliceName::RestaurantInfo => json!({
            "cuisine": "",
            "openingHours": default_opening_hours(),
        }),
        SliceName::Contact => json!({ "preferredChannel": "email" }),
        SliceName::BusinessData => json!({
            "currency": "EUR",
            "paymentMethods": ["cash", "card"],
        }),
        SliceName::TechSetup => json!({
            "hasWifi": false,
            "posSystem": "",
            "printerCount": 0,
        }),
        SliceName::Tables => json!({
            "indoorTables": 0,
            "outdoorTables": 0,
            "seatsPerTable": 4,
        }),
        SliceName::Menu => json!({ "categories": [], "uploads": [] }),
        SliceName::Agreement => json!({ "acceptedTerms": false }),
    };
    match value {
        Value::Object(map) => map,
        _ => JsonMap::new(),
    }
}

/// The slice's stored data shallow-merged over its default template.
pub fn with_defaults(slice: SliceName, stored: &JsonMap) -> JsonMap {
    let mut form = defaults(slice);
    merge_fields(&mut form, stored.clone());
    form
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn is_filled(value: Option<&Value>, rule: FieldRule) -> Result<(), &'static str> {
    let value = match value {
        None | Some(Value::Null) => return Err("is required"),
        Some(v) => v,
    };
    match rule {
        FieldRule::Text => match value {
            Value::String(s) if s.trim().is_empty() => Err("is required"),
            Value::String(_) | Value::Number(_) => Ok(()),
            _ => Err("must be text"),
        },
        FieldRule::Email => match value {
            Value::String(s) if s.trim().is_empty() => Err("is required"),
            Value::String(s) if s.trim().to_string().validate_email() => Ok(()),
            _ => Err("must be a valid email address"),
        },
        FieldRule::List => match value {
            Value::Array(items) if !items.is_empty() => Ok(()),
            Value::Array(_) => Err("needs at least one entry"),
            _ => Err("must be a list"),
        },
        FieldRule::Accepted => match value {
            Value::Bool(true) => Ok(()),
            _ => Err("must be accepted"),
        },
        FieldRule::Count => match value {
            Value::Number(n) if n.as_u64().is_some_and(|n| n > 0) => Ok(()),
            Value::String(s) if s.trim().parse::<u64>().is_ok_and(|n| n > 0) => Ok(()),
            Value::String(s) if s.trim().is_empty() => Err("is required"),
            _ => Err("must be at least 1"),
        },
    }
}

/// Check the required fields of `slice` against `data`.
///
/// Runs locally with no I/O. On failure returns
/// [`CoreError::FieldValidation`] with one message per offending field,
/// keyed by field name.
pub fn validate_required(slice: SliceName, data: &JsonMap) -> Result<(), CoreError> {
    let errors: FieldErrors = required_fields(slice)
        .iter()
        .filter_map(|field| {
            is_filled(data.get(field.key), field.rule)
                .err()
                .map(|msg| (field.key.to_string(), format!("{} {msg}", field.label)))
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CoreError::FieldValidation(errors))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn map(value: Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    fn can_leave_step(slice: SliceName, data: &JsonMap) -> bool {
        validate_required(slice, data).is_ok()
    }

    #[test]
    fn defaults_are_pure() {
        for slice in SliceName::ALL {
            assert_eq!(defaults(slice), defaults(slice));
            assert_eq!(with_defaults(slice, &JsonMap::new()), defaults(slice));
        }
    }

    #[test]
    fn default_opening_hours_cover_the_week() {
        let form = defaults(SliceName::RestaurantInfo);
        let hours = form["openingHours"].as_object().unwrap();
        assert_eq!(hours.len(), 7);
        assert_eq!(hours["sunday"]["open"], "11:30");
    }

    #[test]
    fn stored_values_override_defaults() {
        let stored = map(json!({ "seatsPerTable": 6 }));
        let form = with_defaults(SliceName::Tables, &stored);
        assert_eq!(form["seatsPerTable"], 6);
        assert_eq!(form["outdoorTables"], 0);
    }

    #[test]
    fn labels_are_nonempty() {
        for slice in SliceName::ALL {
            assert!(!label(slice).is_empty());
        }
    }

    #[test]
    fn restaurant_requires_name_and_address() {
        let err = validate_required(SliceName::RestaurantInfo, &map(json!({ "name": "  " })));
        assert_matches!(err, Err(CoreError::FieldValidation(fields)) => {
            assert_eq!(fields.len(), 4);
            assert!(fields["name"].contains("required"));
            assert!(fields.contains_key("city"));
        });
    }

    #[test]
    fn restaurant_passes_when_complete() {
        let data = map(json!({
            "name": "Bella Napoli",
            "street": "Via Roma 1",
            "zipCode": "80100",
            "city": "Napoli",
        }));
        assert!(validate_required(SliceName::RestaurantInfo, &data).is_ok());
    }

    #[test]
    fn contact_email_must_parse() {
        let data = map(json!({
            "firstName": "Gina",
            "lastName": "Rossi",
            "email": "not-an-email",
            "phone": "+39 081 000",
        }));
        assert_matches!(
            validate_required(SliceName::Contact, &data),
            Err(CoreError::FieldValidation(fields)) => {
                assert_eq!(fields.len(), 1);
                assert!(fields["email"].contains("valid email"));
            }
        );

        let mut fixed = data.clone();
        fixed.insert("email".into(), json!("gina@bellanapoli.it"));
        assert!(validate_required(SliceName::Contact, &fixed).is_ok());
    }

    #[test]
    fn tech_setup_has_no_required_fields() {
        assert!(can_leave_step(SliceName::TechSetup, &JsonMap::new()));
    }

    #[test]
    fn tables_need_at_least_one_indoor_table() {
        let form = with_defaults(SliceName::Tables, &JsonMap::new());
        assert_matches!(
            validate_required(SliceName::Tables, &form),
            Err(CoreError::FieldValidation(fields)) if fields["indoorTables"] == "Indoor tables must be at least 1"
        );

        let form = with_defaults(SliceName::Tables, &map(json!({ "indoorTables": 6 })));
        assert!(can_leave_step(SliceName::Tables, &form));
        let form = with_defaults(SliceName::Tables, &map(json!({ "indoorTables": "3" })));
        assert!(can_leave_step(SliceName::Tables, &form));
        let form = with_defaults(SliceName::Tables, &map(json!({ "indoorTables": -2 })));
        assert!(!can_leave_step(SliceName::Tables, &form));
    }

    #[test]
    fn menu_needs_a_category() {
        let form = with_defaults(SliceName::Menu, &JsonMap::new());
        assert!(!can_leave_step(SliceName::Menu, &form));

        let form = with_defaults(SliceName::Menu, &map(json!({ "categories": ["Pizze"] })));
        assert!(can_leave_step(SliceName::Menu, &form));
    }

    #[test]
    fn agreement_terms_must_be_true() {
        let data = map(json!({
            "signatoryName": "Gina Rossi",
            "signature": "data:image/png;base64,AAAA",
            "acceptedTerms": "yes",
        }));
        assert_matches!(
            validate_required(SliceName::Agreement, &data),
            Err(CoreError::FieldValidation(fields)) => {
                assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["acceptedTerms"]);
            }
        );
    }

    #[test]
    fn null_counts_as_missing() {
        let data = map(json!({ "legalName": null, "taxId": "IT123", "iban": "IT60X054" }));
        assert_matches!(
            validate_required(SliceName::BusinessData, &data),
            Err(CoreError::FieldValidation(fields)) if fields.contains_key("legalName")
        );
    }
}
