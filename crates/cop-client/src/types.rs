//! Layer and object addressing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Scope in which an object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LayerType {
    Tenant,
    Solution,
    Account,
    User,
    GlobalUser,
    LocalUser,
}

impl LayerType {
    pub const ALL: [LayerType; 6] = [
        LayerType::Tenant,
        LayerType::Solution,
        LayerType::Account,
        LayerType::User,
        LayerType::GlobalUser,
        LayerType::LocalUser,
    ];

    /// Value sent in the `layer-type` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::Tenant => "TENANT",
            LayerType::Solution => "SOLUTION",
            LayerType::Account => "ACCOUNT",
            LayerType::User => "USER",
            LayerType::GlobalUser => "GLOBALUSER",
            LayerType::LocalUser => "LOCALUSER",
        }
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        LayerType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::InvalidReference(format!(
                    "unknown layer type '{}' (expected one of TENANT, SOLUTION, ACCOUNT, USER, GLOBALUSER, LOCALUSER)",
                    s
                ))
            })
    }
}

/// A layer: type plus identifier, e.g. `TENANT` + tenant id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layer {
    pub layer_type: LayerType,
    pub id: String,
}

impl Layer {
    pub fn new(layer_type: LayerType, id: impl Into<String>) -> Self {
        Self {
            layer_type,
            id: id.into(),
        }
    }

    /// The tenant layer, the usual default.
    pub fn tenant(id: impl Into<String>) -> Self {
        Self::new(LayerType::Tenant, id)
    }
}

/// Fully-qualified reference to one object.
///
/// The string form is `type|id|layerType|layerId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub type_name: String,
    pub object_id: String,
    pub layer: Layer,
}

impl FromStr for ObjectRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('|').collect();
        let [type_name, object_id, layer_type, layer_id] = parts.as_slice() else {
            return Err(Error::InvalidReference(format!(
                "expected 'type|id|layerType|layerId', got '{}'",
                s
            )));
        };

        if [type_name, object_id, layer_id]
            .iter()
            .any(|p| p.trim().is_empty())
        {
            return Err(Error::InvalidReference(format!(
                "empty field in object reference '{}'",
                s
            )));
        }

        Ok(Self {
            type_name: type_name.to_string(),
            object_id: object_id.to_string(),
            layer: Layer::new(layer_type.parse()?, *layer_id),
        })
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.type_name, self.object_id, self.layer.layer_type, self.layer.id
        )
    }
}
