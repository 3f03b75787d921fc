//! Thing events emitted after a modification was applied.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{ResourceKey, ResourcePath};
use crate::signals::things::ThingCommand;
use crate::signals::THING_RESOURCE_TYPE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThingEvent {
    #[serde(rename = "things.events:attributeModified", rename_all = "camelCase")]
    AttributeModified {
        thing_id: String,
        attribute: ResourcePath,
        value: Value,
        revision: u64,
    },

    #[serde(rename = "things.events:attributeDeleted", rename_all = "camelCase")]
    AttributeDeleted {
        thing_id: String,
        attribute: ResourcePath,
        revision: u64,
    },

    #[serde(rename = "things.events:featurePropertyModified", rename_all = "camelCase")]
    FeaturePropertyModified {
        thing_id: String,
        feature_id: String,
        property: ResourcePath,
        value: Value,
        revision: u64,
    },

    #[serde(rename = "things.events:featurePropertyDeleted", rename_all = "camelCase")]
    FeaturePropertyDeleted {
        thing_id: String,
        feature_id: String,
        property: ResourcePath,
        revision: u64,
    },
}

impl ThingEvent {
    /// Event describing the effect of a modifying command; `None` for queries.
    pub fn from_command(cmd: &ThingCommand, revision: u64) -> Option<Self> {
        match cmd.clone() {
            ThingCommand::ModifyAttribute { thing_id, attribute, value } => {
                Some(ThingEvent::AttributeModified { thing_id, attribute, value, revision })
            }
            ThingCommand::DeleteAttribute { thing_id, attribute } => {
                Some(ThingEvent::AttributeDeleted { thing_id, attribute, revision })
            }
            ThingCommand::ModifyFeatureProperty { thing_id, feature_id, property, value } => {
                Some(ThingEvent::FeaturePropertyModified {
                    thing_id,
                    feature_id,
                    property,
                    value,
                    revision,
                })
            }
            ThingCommand::DeleteFeatureProperty { thing_id, feature_id, property } => {
                Some(ThingEvent::FeaturePropertyDeleted { thing_id, feature_id, property, revision })
            }
            ThingCommand::RetrieveThing { .. }
            | ThingCommand::RetrieveAttributes { .. }
            | ThingCommand::RetrieveAttribute { .. }
            | ThingCommand::RetrieveFeatures { .. }
            | ThingCommand::RetrieveFeature { .. }
            | ThingCommand::RetrieveFeatureProperties { .. }
            | ThingCommand::RetrieveFeatureProperty { .. } => None,
        }
    }

    pub fn thing_id(&self) -> &str {
        match self {
            ThingEvent::AttributeModified { thing_id, .. }
            | ThingEvent::AttributeDeleted { thing_id, .. }
            | ThingEvent::FeaturePropertyModified { thing_id, .. }
            | ThingEvent::FeaturePropertyDeleted { thing_id, .. } => thing_id,
        }
    }

    pub fn revision(&self) -> u64 {
        match self {
            ThingEvent::AttributeModified { revision, .. }
            | ThingEvent::AttributeDeleted { revision, .. }
            | ThingEvent::FeaturePropertyModified { revision, .. }
            | ThingEvent::FeaturePropertyDeleted { revision, .. } => *revision,
        }
    }

    /// New value carried by the event, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            ThingEvent::AttributeModified { value, .. }
            | ThingEvent::FeaturePropertyModified { value, .. } => Some(value),
            ThingEvent::AttributeDeleted { .. } | ThingEvent::FeaturePropertyDeleted { .. } => None,
        }
    }

    pub fn resource_path(&self) -> ResourcePath {
        let root = ResourcePath::root();
        match self {
            ThingEvent::AttributeModified { attribute, .. }
            | ThingEvent::AttributeDeleted { attribute, .. } => root.child("attributes").join(attribute),
            ThingEvent::FeaturePropertyModified { feature_id, property, .. }
            | ThingEvent::FeaturePropertyDeleted { feature_id, property, .. } => root
                .child("features")
                .child(feature_id.as_str())
                .child("properties")
                .join(property),
        }
    }

    pub fn resource_key(&self) -> ResourceKey {
        ResourceKey::new_unchecked(THING_RESOURCE_TYPE, self.resource_path())
    }

    /// Copy of the event with its value replaced (used to deliver a filtered view).
    pub fn with_value(&self, new_value: Value) -> Self {
        let mut out = self.clone();
        match &mut out {
            ThingEvent::AttributeModified { value, .. }
            | ThingEvent::FeaturePropertyModified { value, .. } => *value = new_value,
            ThingEvent::AttributeDeleted { .. } | ThingEvent::FeaturePropertyDeleted { .. } => {}
        }
        out
    }
}
