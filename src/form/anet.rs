use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Reference to another entity, held by `anet_object` fields and the
/// elements of `array_of_anet_objects` fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub uuid: String,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            uuid: uuid.into(),
        }
    }

    /// Reads a stored reference. Both `type` and `uuid` must be non-empty
    /// strings; anything partial is treated as no reference.
    pub fn from_value(value: &Value) -> Option<Self> {
        let entity_type = value.get("type")?.as_str()?;
        let uuid = value.get("uuid")?.as_str()?;
        if entity_type.is_empty() || uuid.is_empty() {
            return None;
        }
        Some(Self::new(entity_type, uuid))
    }

    pub fn to_value(&self) -> Value {
        json!({"type": self.entity_type, "uuid": self.uuid})
    }

    pub fn collection(&self) -> Option<&'static str> {
        collection_for(&self.entity_type)
    }

    /// Link to the entity's page, `/{collection}/{uuid}`.
    pub fn href(&self) -> Option<String> {
        let collection = self.collection()?;
        Some(format!(
            "/{collection}/{}",
            utf8_percent_encode(&self.uuid, PATH_SEGMENT)
        ))
    }
}

/// URL collection of an entity model name.
pub fn collection_for(model: &str) -> Option<&'static str> {
    Some(match model {
        "Attachment" => "attachments",
        "AuthorizationGroup" => "authorizationGroups",
        "Event" => "events",
        "EventSeries" => "eventSeries",
        "Location" => "locations",
        "Organization" => "organizations",
        "Person" => "people",
        "Position" => "positions",
        "Report" => "reports",
        "Task" => "tasks",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_references_are_not_references() {
        assert!(EntityRef::from_value(&json!({"type": "Person", "uuid": null})).is_none());
        assert!(EntityRef::from_value(&json!({"type": "Person"})).is_none());
        assert!(EntityRef::from_value(&json!({"type": "", "uuid": "a"})).is_none());
        assert_eq!(
            EntityRef::from_value(&json!({"type": "Person", "uuid": "abc"})),
            Some(EntityRef::new("Person", "abc"))
        );
    }

    #[test]
    fn links_use_model_collections() {
        let person = EntityRef::new("Person", "a b/c");
        assert_eq!(person.href().as_deref(), Some("/people/a%20b%2Fc"));
        assert_eq!(
            EntityRef::new("EventSeries", "1f-2").href().as_deref(),
            Some("/eventSeries/1f-2")
        );
        assert!(EntityRef::new("Spaceship", "x").href().is_none());
    }
}
