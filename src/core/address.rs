use crate::domain::model::{is_blank, LocationFields};

pub const DEFAULT_STATE: &str = "PA";

/// `"{street}, {city}, {state} {zip}"` for handing to a geocoder.
///
/// City falls back to the municipality and state to `default_state` when
/// either is missing.
pub fn form_full_address(fields: &LocationFields, default_state: &str) -> String {
    let city = if is_blank(fields.city.as_deref()) {
        fields.municipality.as_deref().unwrap_or_default()
    } else {
        fields.city.as_deref().unwrap_or_default()
    };

    let state = if is_blank(fields.state.as_deref()) {
        default_state
    } else {
        fields.state.as_deref().unwrap_or(default_state)
    };

    format!(
        "{}, {}, {} {}",
        fields.street_address.as_deref().unwrap_or_default().trim(),
        city.trim(),
        state.trim(),
        fields.zip_code.as_deref().unwrap_or_default().trim()
    )
}

/// Whether `geocoding_properties` came from a confidence-scored (Pelias)
/// geocoding, which is not trusted.
///
/// Properties are stored as serialized maps, either single-quoted
/// (`{'confidence': 0.6, ...}`) or JSON (`{"confidence": 0.6, ...}`).
pub fn is_low_confidence(geocoding_properties: Option<&str>) -> bool {
    geocoding_properties
        .is_some_and(|props| props.contains("'confidence'") || props.contains("\"confidence\""))
}

/// Coordinates are missing or only low-confidence and should be redone.
pub fn needs_geocoding(fields: &LocationFields) -> bool {
    fields.latitude.is_none() || is_low_confidence(fields.geocoding_properties.as_deref())
}
