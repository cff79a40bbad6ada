//! Create-movie payload

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::ValidationError;

/// Body of `POST /movie`.
///
/// `name` of any non-string type deserializes to `None` so it can be
/// reported as a field error instead of a parse error.
#[derive(Debug, Deserialize)]
pub struct CreateMovieRequest {
    #[serde(default, deserialize_with = "string_or_none")]
    pub name: Option<String>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

impl CreateMovieRequest {
    /// Parse a raw body. Anything that is not a JSON object is rejected.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        let invalid = |e: serde_json::Error| ValidationError::InvalidJson {
            reason: e.to_string(),
        };

        // Objects only; a derived struct would also accept a JSON array
        let object: Map<String, Value> = serde_json::from_slice(body).map_err(invalid)?;
        Self::deserialize(Value::Object(object)).map_err(invalid)
    }

    pub fn into_title(self) -> Result<MovieTitle, ValidationError> {
        let name = self.name.ok_or(ValidationError::Missing { field: "name" })?;
        MovieTitle::new(name)
    }
}

/// Validated, non-empty movie title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieTitle(String);

impl MovieTitle {
    pub fn new(title: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }
        Ok(Self(title))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(body: &str) -> Result<MovieTitle, ValidationError> {
        CreateMovieRequest::from_slice(body.as_bytes())?.into_title()
    }

    #[test]
    fn accepts_name() {
        assert_eq!(title(r#"{"name": "Heat"}"#).unwrap().as_str(), "Heat");
    }

    #[test]
    fn ignores_unknown_fields() {
        assert_eq!(
            title(r#"{"name": "Heat", "year": 1995}"#).unwrap().as_str(),
            "Heat"
        );
    }

    #[test]
    fn missing_name() {
        assert_eq!(title("{}"), Err(ValidationError::Missing { field: "name" }));
    }

    #[test]
    fn non_string_name() {
        assert_eq!(
            title(r#"{"name": 42}"#),
            Err(ValidationError::Missing { field: "name" })
        );
        assert_eq!(
            title(r#"{"name": null}"#),
            Err(ValidationError::Missing { field: "name" })
        );
    }

    #[test]
    fn empty_name() {
        assert_eq!(
            title(r#"{"name": ""}"#),
            Err(ValidationError::Empty { field: "name" })
        );
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(
            title("not json"),
            Err(ValidationError::InvalidJson { .. })
        ));
    }

    #[test]
    fn non_object_json() {
        assert!(matches!(
            title(r#""not json""#),
            Err(ValidationError::InvalidJson { .. })
        ));
        assert!(matches!(
            title(r#"["Heat"]"#),
            Err(ValidationError::InvalidJson { .. })
        ));
    }
}
