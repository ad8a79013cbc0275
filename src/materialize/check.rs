//! Datadog check configuration document.

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

/// One `conf.d/<type>.yaml` document.
///
/// `instances` is required; `init_config` may be absent or `null` (the usual
/// `init_config:` line in Datadog examples) and is then empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub init_config: Mapping,
    pub instances: Vec<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Mapping, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Mapping>::deserialize(deserializer)?.unwrap_or_default())
}

impl CheckConfig {
    /// Parse a rendered template.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Fold another fragment into this aggregate.
    ///
    /// Instances are appended in order. `init_config` keys are unioned and a
    /// key already present takes the incoming value (last writer wins) while
    /// keeping its original position.
    pub fn merge(&mut self, other: CheckConfig) {
        for (key, value) in other.init_config {
            self.init_config.insert(key, value);
        }
        self.instances.extend(other.instances);
    }
}
