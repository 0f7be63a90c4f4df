use serde_json::Value;
use thiserror::Error;

/// Keys a creation request must carry before any side effect occurs.
pub const REQUIRED_FIELDS: [&str; 8] = [
    "age",
    "imageUrl",
    "name",
    "phoneNumber",
    "size",
    "latLong",
    "description",
    "species",
];

/// Errors produced while validating an inbound submission.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("missing or empty required field: {0}")]
    MissingField(&'static str),
}

/// A submission that passed the required-field check, with every field
/// coerced to its text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimalSubmission {
    pub name: String,
    pub age: String,
    pub size: String,
    pub species: String,
    pub image_url: String,
    pub description: String,
    pub phone_number: String,
    pub lat_long: String,
}

impl AnimalSubmission {
    /// Validates an arbitrary JSON body against the required-field list.
    ///
    /// A field passes iff it is present and truthy: JSON `null`, `""`, `0`
    /// and `false` are rejected, while the string `"0"` passes. Non-string
    /// values that pass are coerced to their JSON text rendering, since
    /// every persisted column is text. Pure; no side effects.
    pub fn from_value(body: &Value) -> Result<Self, ValidationError> {
        let object = body.as_object().ok_or(ValidationError::NotAnObject)?;

        for field in REQUIRED_FIELDS {
            let truthy = object.get(field).is_some_and(is_truthy);
            if !truthy {
                return Err(ValidationError::MissingField(field));
            }
        }

        Ok(Self {
            name: coerce_text(&object["name"]),
            age: coerce_text(&object["age"]),
            size: coerce_text(&object["size"]),
            species: coerce_text(&object["species"]),
            image_url: coerce_text(&object["imageUrl"]),
            description: coerce_text(&object["description"]),
            phone_number: coerce_text(&object["phoneNumber"]),
            lat_long: coerce_text(&object["latLong"]),
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
