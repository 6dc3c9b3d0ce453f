use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::field::Family;

/// A structured user query, as handed over by the web layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Query {
    /// Platform of the device the commands are meant for.
    pub platform: String,
    /// Directive id.
    pub directive: String,
    /// Raw target value, validated against the directive's first field.
    pub target: String,
    /// Raw values for the directive's additional fields, keyed by field name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl Query {
    pub fn new(platform: &str, directive: &str, target: &str) -> Self {
        Self {
            platform: platform.to_string(),
            directive: directive.to_string(),
            target: target.to_string(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a value for an additional field.
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }
}

/// Ambient source addresses, supplied by the caller's network context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Sources {
    #[serde(default)]
    pub source4: Option<Ipv4Addr>,
    #[serde(default)]
    pub source6: Option<Ipv6Addr>,
}

impl Sources {
    /// The source address for `family`, rendered for substitution.
    pub fn get(&self, family: Family) -> Option<String> {
        match family {
            Family::V4 => self.source4.map(|a| a.to_string()),
            Family::V6 => self.source6.map(|a| a.to_string()),
        }
    }

    /// Fill unset addresses from `defaults`.
    pub fn or(self, defaults: Sources) -> Sources {
        Sources {
            source4: self.source4.or(defaults.source4),
            source6: self.source6.or(defaults.source6),
        }
    }
}
