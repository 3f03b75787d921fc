//! Thing commands (JSON, internally tagged by `type`).
//!
//! ```json
//! { "type": "things.commands:modifyFeatureProperty",
//!   "thingId": "org.acme:boiler-7", "featureId": "temperature",
//!   "property": "/value", "value": 21.5 }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TwinGuardError};
use crate::model::{Permission, ResourceKey, ResourcePath};
use crate::signals::THING_RESOURCE_TYPE;

/// Commands addressed to a single thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThingCommand {
    #[serde(rename = "things.commands:retrieveThing", rename_all = "camelCase")]
    RetrieveThing { thing_id: String },

    #[serde(rename = "things.commands:retrieveAttributes", rename_all = "camelCase")]
    RetrieveAttributes { thing_id: String },

    #[serde(rename = "things.commands:retrieveAttribute", rename_all = "camelCase")]
    RetrieveAttribute { thing_id: String, attribute: ResourcePath },

    #[serde(rename = "things.commands:retrieveFeatures", rename_all = "camelCase")]
    RetrieveFeatures { thing_id: String },

    #[serde(rename = "things.commands:retrieveFeature", rename_all = "camelCase")]
    RetrieveFeature { thing_id: String, feature_id: String },

    #[serde(rename = "things.commands:retrieveFeatureProperties", rename_all = "camelCase")]
    RetrieveFeatureProperties { thing_id: String, feature_id: String },

    #[serde(rename = "things.commands:retrieveFeatureProperty", rename_all = "camelCase")]
    RetrieveFeatureProperty {
        thing_id: String,
        feature_id: String,
        property: ResourcePath,
    },

    #[serde(rename = "things.commands:modifyAttribute", rename_all = "camelCase")]
    ModifyAttribute {
        thing_id: String,
        attribute: ResourcePath,
        value: Value,
    },

    #[serde(rename = "things.commands:deleteAttribute", rename_all = "camelCase")]
    DeleteAttribute { thing_id: String, attribute: ResourcePath },

    #[serde(rename = "things.commands:modifyFeatureProperty", rename_all = "camelCase")]
    ModifyFeatureProperty {
        thing_id: String,
        feature_id: String,
        property: ResourcePath,
        value: Value,
    },

    #[serde(rename = "things.commands:deleteFeatureProperty", rename_all = "camelCase")]
    DeleteFeatureProperty {
        thing_id: String,
        feature_id: String,
        property: ResourcePath,
    },
}

impl ThingCommand {
    /// Parse and validate a command from JSON text.
    pub fn from_json(s: &str) -> Result<Self> {
        let cmd: ThingCommand = serde_json::from_str(s)
            .map_err(|e| TwinGuardError::BadRequest(format!("invalid thing command: {e}")))?;
        cmd.validate()?;
        Ok(cmd)
    }

    /// Check ids and pointers that serde alone cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.thing_id().is_empty() {
            return Err(TwinGuardError::BadRequest(format!("{}: thingId must not be empty", self.name())));
        }
        if let Some(feature_id) = self.feature_id() {
            if feature_id.is_empty() || feature_id.contains('/') {
                return Err(TwinGuardError::InvalidResourceKey(format!(
                    "{}: invalid featureId: {feature_id:?}",
                    self.name()
                )));
            }
        }
        match self {
            ThingCommand::RetrieveAttribute { attribute, .. }
            | ThingCommand::ModifyAttribute { attribute, .. }
            | ThingCommand::DeleteAttribute { attribute, .. }
                if attribute.is_root() =>
            {
                Err(TwinGuardError::InvalidResourceKey(format!(
                    "{}: attribute pointer must not be empty",
                    self.name()
                )))
            }
            ThingCommand::RetrieveFeatureProperty { property, .. }
            | ThingCommand::ModifyFeatureProperty { property, .. }
            | ThingCommand::DeleteFeatureProperty { property, .. }
                if property.is_root() =>
            {
                Err(TwinGuardError::InvalidResourceKey(format!(
                    "{}: property pointer must not be empty",
                    self.name()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Short command name (the part after `things.commands:`).
    pub fn name(&self) -> &'static str {
        match self {
            ThingCommand::RetrieveThing { .. } => "retrieveThing",
            ThingCommand::RetrieveAttributes { .. } => "retrieveAttributes",
            ThingCommand::RetrieveAttribute { .. } => "retrieveAttribute",
            ThingCommand::RetrieveFeatures { .. } => "retrieveFeatures",
            ThingCommand::RetrieveFeature { .. } => "retrieveFeature",
            ThingCommand::RetrieveFeatureProperties { .. } => "retrieveFeatureProperties",
            ThingCommand::RetrieveFeatureProperty { .. } => "retrieveFeatureProperty",
            ThingCommand::ModifyAttribute { .. } => "modifyAttribute",
            ThingCommand::DeleteAttribute { .. } => "deleteAttribute",
            ThingCommand::ModifyFeatureProperty { .. } => "modifyFeatureProperty",
            ThingCommand::DeleteFeatureProperty { .. } => "deleteFeatureProperty",
        }
    }

    pub fn thing_id(&self) -> &str {
        match self {
            ThingCommand::RetrieveThing { thing_id }
            | ThingCommand::RetrieveAttributes { thing_id }
            | ThingCommand::RetrieveAttribute { thing_id, .. }
            | ThingCommand::RetrieveFeatures { thing_id }
            | ThingCommand::RetrieveFeature { thing_id, .. }
            | ThingCommand::RetrieveFeatureProperties { thing_id, .. }
            | ThingCommand::RetrieveFeatureProperty { thing_id, .. }
            | ThingCommand::ModifyAttribute { thing_id, .. }
            | ThingCommand::DeleteAttribute { thing_id, .. }
            | ThingCommand::ModifyFeatureProperty { thing_id, .. }
            | ThingCommand::DeleteFeatureProperty { thing_id, .. } => thing_id,
        }
    }

    pub fn feature_id(&self) -> Option<&str> {
        match self {
            ThingCommand::RetrieveFeature { feature_id, .. }
            | ThingCommand::RetrieveFeatureProperties { feature_id, .. }
            | ThingCommand::RetrieveFeatureProperty { feature_id, .. }
            | ThingCommand::ModifyFeatureProperty { feature_id, .. }
            | ThingCommand::DeleteFeatureProperty { feature_id, .. } => Some(feature_id),
            _ => None,
        }
    }

    /// Queries read; everything else mutates.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            ThingCommand::RetrieveThing { .. }
                | ThingCommand::RetrieveAttributes { .. }
                | ThingCommand::RetrieveAttribute { .. }
                | ThingCommand::RetrieveFeatures { .. }
                | ThingCommand::RetrieveFeature { .. }
                | ThingCommand::RetrieveFeatureProperties { .. }
                | ThingCommand::RetrieveFeatureProperty { .. }
        )
    }

    pub fn required_permission(&self) -> Permission {
        if self.is_query() {
            Permission::Read
        } else {
            Permission::Write
        }
    }

    /// Path inside the thing document the command addresses.
    pub fn resource_path(&self) -> ResourcePath {
        let root = ResourcePath::root();
        match self {
            ThingCommand::RetrieveThing { .. } => root,
            ThingCommand::RetrieveAttributes { .. } => root.child("attributes"),
            ThingCommand::RetrieveAttribute { attribute, .. }
            | ThingCommand::ModifyAttribute { attribute, .. }
            | ThingCommand::DeleteAttribute { attribute, .. } => root.child("attributes").join(attribute),
            ThingCommand::RetrieveFeatures { .. } => root.child("features"),
            ThingCommand::RetrieveFeature { feature_id, .. } => {
                root.child("features").child(feature_id.as_str())
            }
            ThingCommand::RetrieveFeatureProperties { feature_id, .. } => root
                .child("features")
                .child(feature_id.as_str())
                .child("properties"),
            ThingCommand::RetrieveFeatureProperty { feature_id, property, .. }
            | ThingCommand::ModifyFeatureProperty { feature_id, property, .. }
            | ThingCommand::DeleteFeatureProperty { feature_id, property, .. } => root
                .child("features")
                .child(feature_id.as_str())
                .child("properties")
                .join(property),
        }
    }

    pub fn resource_key(&self) -> ResourceKey {
        ResourceKey::new_unchecked(THING_RESOURCE_TYPE, self.resource_path())
    }
}
