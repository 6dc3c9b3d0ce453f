//! Field validators: typed descriptors for user-supplied query values.
//!
//! A [`Field`] is compiled once from its [`FieldDef`] at load time. Validation
//! is pure: any raw string yields either a [`FieldValue`] or a
//! [`FieldValidationError`], never a panic.

use std::fmt;
use std::net::IpAddr;

use ipnet::IpNet;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::FieldValidationError;
use crate::platform::Interface;

/// Name given to the first field of a directive when the definition omits one.
pub const TARGET: &str = "target";

const DEFAULT_MAX_LENGTH: usize = 256;

/// Characters that never reach a command template on any platform.
/// `|` starts a pipe in a shell and an output modifier on device CLIs.
const FORBIDDEN_CHARS: &[char] = &['"', '\'', '`', '\\', ';', '&', '<', '>', '{', '}', '|'];

// ── Definition (serialized) types ──

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub description: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text, optionally constrained by a full-match regex.
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        validation: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    /// An IP address, or a prefix when `allow_prefix` is set.
    IpAddress {
        #[serde(default = "default_true")]
        allow_prefix: bool,
    },
    /// A string that must fully match `pattern`.
    Pattern { pattern: String },
    /// One of a fixed set of values.
    Select { options: Vec<SelectOption> },
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SelectOption {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ── Validated values ──

/// IP address family of a validated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// The ambient source placeholder that belongs to this family.
    pub fn source_placeholder(self) -> &'static str {
        match self {
            Family::V4 => "source4",
            Family::V6 => "source6",
        }
    }

    pub fn of(net: &IpNet) -> Self {
        match net {
            IpNet::V4(_) => Family::V4,
            IpNet::V6(_) => Family::V6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Family::V4 => "IPv4",
            Family::V6 => "IPv6",
        })
    }
}

/// A value that passed field validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// An address (`prefix == false`) or a network.
    Ip { net: IpNet, prefix: bool },
    Text(String),
}

impl FieldValue {
    /// Classify already-validated text: anything that parses as an address or
    /// prefix becomes an IP value.
    fn classify(value: &str) -> Self {
        if let Some(ip) = parse_ip(value) {
            return ip;
        }
        FieldValue::Text(value.to_string())
    }

    pub fn family(&self) -> Option<Family> {
        match self {
            FieldValue::Ip { net, .. } => Some(Family::of(net)),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_net(&self) -> Option<&IpNet> {
        match self {
            FieldValue::Ip { net, .. } => Some(net),
            FieldValue::Text(_) => None,
        }
    }

    /// Canonical string form used for matching and substitution.
    pub fn canonical(&self) -> String {
        match self {
            FieldValue::Ip { net, prefix: true } => net.trunc().to_string(),
            FieldValue::Ip { net, prefix: false } => net.addr().to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn parse_ip(value: &str) -> Option<FieldValue> {
    if let Ok(net) = value.parse::<IpNet>() {
        return Some(FieldValue::Ip { net, prefix: true });
    }
    value.parse::<IpAddr>().ok().map(|addr| FieldValue::Ip {
        net: IpNet::from(addr),
        prefix: false,
    })
}

// ── Compiled field ──

#[derive(Debug, Clone)]
enum Validator {
    Text {
        validation: Option<Regex>,
        max_length: usize,
    },
    IpAddress {
        allow_prefix: bool,
    },
    Pattern(Regex),
    Select(Vec<SelectOption>),
}

/// A compiled input descriptor.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    description: String,
    validator: Validator,
}

impl Field {
    /// Compile a definition. `default_name` applies when the definition has no name.
    /// Errors are returned as a reason string for the caller to attach context to.
    pub fn compile(def: &FieldDef, default_name: &str) -> Result<Self, String> {
        let name = def.name.clone().unwrap_or_else(|| default_name.to_string());
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("field name {name:?} must be non-empty [A-Za-z0-9_]"));
        }
        let validator = match &def.kind {
            FieldKind::Text {
                validation,
                max_length,
            } => Validator::Text {
                validation: validation.as_deref().map(full_match).transpose()?,
                max_length: max_length.unwrap_or(DEFAULT_MAX_LENGTH),
            },
            FieldKind::IpAddress { allow_prefix } => Validator::IpAddress {
                allow_prefix: *allow_prefix,
            },
            FieldKind::Pattern { pattern } => Validator::Pattern(full_match(pattern)?),
            FieldKind::Select { options } => {
                if options.is_empty() {
                    return Err("select field has no options".into());
                }
                for opt in options {
                    check_safe(&name, &opt.value, Interface::Shell)
                        .map_err(|e| format!("option {:?}: {}", opt.value, e.reason))?;
                }
                Validator::Select(options.clone())
            }
        };
        Ok(Self {
            name,
            description: def.description.clone(),
            validator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Validate and normalize a raw user value bound for a platform reached
    /// through `interface`.
    pub fn validate(
        &self,
        raw: &str,
        interface: Interface,
    ) -> Result<FieldValue, FieldValidationError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(self.error("value is empty"));
        }
        check_safe(&self.name, value, interface)?;

        match &self.validator {
            Validator::Text {
                validation,
                max_length,
            } => {
                if value.chars().count() > *max_length {
                    return Err(self.error(format!("longer than {max_length} characters")));
                }
                if let Some(re) = validation
                    && !re.is_match(value)
                {
                    return Err(self.error("does not match the expected format"));
                }
                Ok(FieldValue::classify(value))
            }
            Validator::IpAddress { allow_prefix } => match parse_ip(value) {
                Some(FieldValue::Ip { prefix: true, .. }) if !allow_prefix => {
                    Err(self.error("a single address is required, not a prefix"))
                }
                Some(ip) => Ok(ip),
                None => Err(self.error(format!("{value:?} is not an IP address or prefix"))),
            },
            Validator::Pattern(re) => {
                if !re.is_match(value) {
                    return Err(self.error("does not match the expected format"));
                }
                Ok(FieldValue::classify(value))
            }
            Validator::Select(options) => {
                if !options.iter().any(|o| o.value == value) {
                    return Err(self.error(format!("{value:?} is not one of the allowed options")));
                }
                Ok(FieldValue::classify(value))
            }
        }
    }

    fn error(&self, reason: impl Into<String>) -> FieldValidationError {
        FieldValidationError::new(&self.name, reason)
    }
}

fn full_match(pattern: &str) -> Result<Regex, String> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| format!("invalid regex {pattern:?}: {e}"))
}

/// Reject characters that could escape a template's quoting or start a new command.
fn check_safe(
    field: &str,
    value: &str,
    interface: Interface,
) -> Result<(), FieldValidationError> {
    let extra = interface.forbidden_chars();
    if let Some(c) = value
        .chars()
        .find(|c| c.is_control() || FORBIDDEN_CHARS.contains(c) || extra.contains(c))
    {
        return Err(FieldValidationError::new(
            field,
            format!("character {c:?} is not allowed"),
        ));
    }
    if value.contains("$(") {
        return Err(FieldValidationError::new(field, "\"$(\" is not allowed"));
    }
    Ok(())
}
