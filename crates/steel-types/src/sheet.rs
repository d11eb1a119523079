use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Validated envelope around an opaque character/encounter sheet blob.
///
/// The blob is client-authored and schema-less; the server only requires a
/// string `id` and indexes an optional `name`. Everything else is carried
/// through untouched and replaced wholesale on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetEnvelope {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl SheetEnvelope {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn from_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn to_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_unknown_fields() {
        let blob = json!({
            "id": "c1",
            "name": "Kaslin",
            "ancestry": { "id": "a1", "name": "Polder" },
            "career": "Agent",
            "level": 3,
            "abilities": ["melee", "ranged"]
        });

        let sheet = SheetEnvelope::from_value(blob.clone()).unwrap();
        assert_eq!(sheet.id, "c1");
        assert_eq!(sheet.name.as_deref(), Some("Kaslin"));
        assert_eq!(sheet.to_value().unwrap(), blob);
    }

    #[test]
    fn name_is_optional() {
        let sheet = SheetEnvelope::from_value(json!({ "id": "e9" })).unwrap();
        assert_eq!(sheet.name, None);
        assert_eq!(sheet.to_value().unwrap(), json!({ "id": "e9" }));
    }

    #[test]
    fn rejects_missing_id() {
        assert!(SheetEnvelope::from_value(json!({ "name": "no id" })).is_err());
    }

    #[test]
    fn rejects_non_string_id() {
        assert!(SheetEnvelope::from_value(json!({ "id": 42 })).is_err());
    }
}
