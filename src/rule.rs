//! Rules: the condition/action/command unit evaluated in order within a directive.

use std::net::IpAddr;

use ipnet::IpNet;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::FieldValidationError;
use crate::field::{Family, FieldValue};
use crate::template::Template;

pub const WILDCARD: &str = "*";

/// Permit or deny, as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Permit,
    Deny,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Permit => "permit",
            Action::Deny => "deny",
        }
    }
}

// ── Definition (serialized) type ──

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RuleDef {
    #[serde(default = "wildcard")]
    pub condition: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<String>>,
    /// Smallest target prefix length a network condition accepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ge: Option<u8>,
    /// Largest target prefix length a network condition accepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub le: Option<u8>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_reserved: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_loopback: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_unspecified: bool,
}

fn wildcard() -> String {
    WILDCARD.to_string()
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl RuleDef {
    /// A rule with only a condition and an action; used by tests and programmatic catalogs.
    pub fn new(condition: &str, action: Action) -> Self {
        Self {
            condition: condition.to_string(),
            action,
            command: None,
            commands: None,
            ge: None,
            le: None,
            allow_reserved: false,
            allow_loopback: false,
            allow_unspecified: false,
        }
    }

    pub fn with_command(mut self, command: &str) -> Self {
        self.command = Some(command.to_string());
        self
    }

    pub fn with_commands(mut self, commands: &[&str]) -> Self {
        self.commands = Some(commands.iter().map(|c| c.to_string()).collect());
        self
    }
}

// ── Compiled types ──

/// A network condition with its prefix-length window and address-class policy.
#[derive(Debug, Clone)]
pub struct NetworkCondition {
    pub net: IpNet,
    pub ge: u8,
    pub le: u8,
    pub allow_reserved: bool,
    pub allow_loopback: bool,
    pub allow_unspecified: bool,
}

/// A rule condition, parsed once at load time.
#[derive(Debug, Clone)]
pub enum Condition {
    Network(NetworkCondition),
    Wildcard,
    Pattern(Regex),
    Exact(String),
}

impl Condition {
    /// Parse a condition string together with the rule's network options.
    pub fn parse(def: &RuleDef) -> Result<Self, String> {
        let raw = def.condition.trim();
        let has_network_options = def.ge.is_some()
            || def.le.is_some()
            || def.allow_reserved
            || def.allow_loopback
            || def.allow_unspecified;

        let condition = if raw == WILDCARD {
            Condition::Wildcard
        } else if let Some(net) = parse_net(raw) {
            let max = net.max_prefix_len();
            let ge = def.ge.unwrap_or(net.prefix_len());
            let le = def.le.unwrap_or(max);
            if ge < net.prefix_len() || le > max || ge > le {
                return Err(format!(
                    "prefix window ge={ge} le={le} does not fit {} (/{}..=/{max})",
                    net.trunc(),
                    net.prefix_len()
                ));
            }
            Condition::Network(NetworkCondition {
                net: net.trunc(),
                ge,
                le,
                allow_reserved: def.allow_reserved,
                allow_loopback: def.allow_loopback,
                allow_unspecified: def.allow_unspecified,
            })
        } else if raw.starts_with('^') {
            let re = Regex::new(raw).map_err(|e| format!("invalid condition regex: {e}"))?;
            Condition::Pattern(re)
        } else if raw.is_empty() {
            return Err("empty condition".into());
        } else {
            Condition::Exact(raw.to_string())
        };

        if has_network_options && !matches!(condition, Condition::Network(_)) {
            return Err("ge/le/allow_* options require a network condition".into());
        }
        Ok(condition)
    }

    /// The address family a network condition is limited to.
    pub fn family(&self) -> Option<Family> {
        match self {
            Condition::Network(n) => Some(Family::of(&n.net)),
            _ => None,
        }
    }

    /// Test the condition against a validated target.
    ///
    /// A network condition that contains the target but refuses its address
    /// class yields a validation error for `field`.
    pub fn matches(&self, value: &FieldValue, field: &str) -> Result<bool, FieldValidationError> {
        match self {
            Condition::Wildcard => Ok(true),
            Condition::Exact(s) => Ok(value.canonical() == *s),
            Condition::Pattern(re) => Ok(re.is_match(&value.canonical())),
            Condition::Network(n) => {
                let Some(target) = value.as_net() else {
                    return Ok(false);
                };
                if !n.net.contains(target) {
                    return Ok(false);
                }
                let len = target.prefix_len();
                if len < n.ge || len > n.le {
                    return Ok(false);
                }
                n.check_class(target, field)?;
                Ok(true)
            }
        }
    }
}

impl NetworkCondition {
    fn check_class(&self, target: &IpNet, field: &str) -> Result<(), FieldValidationError> {
        let addr = target.network();
        if addr.is_unspecified() && !self.allow_unspecified {
            return Err(FieldValidationError::new(
                field,
                format!("{target} is an unspecified address"),
            ));
        }
        if addr.is_loopback() && !self.allow_loopback {
            return Err(FieldValidationError::new(
                field,
                format!("{target} is a loopback address"),
            ));
        }
        if is_reserved(addr) && !self.allow_reserved {
            return Err(FieldValidationError::new(
                field,
                format!("{target} is in reserved address space"),
            ));
        }
        Ok(())
    }
}

/// A CIDR condition, or a bare address taken as its host network.
fn parse_net(raw: &str) -> Option<IpNet> {
    raw.parse::<IpNet>()
        .ok()
        .or_else(|| raw.parse::<IpAddr>().ok().map(IpNet::from))
}

/// IETF reserved space: 240.0.0.0/4, and for IPv6 everything below 2000::,
/// 4000:: up to fc00::, and fe00::/9.
fn is_reserved(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(a) => a.octets()[0] >= 240,
        IpAddr::V6(a) => {
            let first = a.segments()[0];
            first < 0x2000 || (0x4000..0xfc00).contains(&first) || (0xfe00..0xfe80).contains(&first)
        }
    }
}

/// What a matched rule does.
#[derive(Debug, Clone)]
pub enum Verdict {
    Permit(Vec<Template>),
    Deny,
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub condition: Condition,
    pub verdict: Verdict,
}

impl Rule {
    /// Compile a rule definition, checking its templates against the known placeholders.
    ///
    /// Template errors carry the offending template text.
    pub fn compile(def: &RuleDef, known: &[&str]) -> Result<Self, RuleError> {
        let condition = Condition::parse(def).map_err(RuleError::Rule)?;

        let raw: Vec<&str> = match (&def.command, &def.commands) {
            (Some(_), Some(_)) => {
                return Err(RuleError::Rule(
                    "both command and commands are set".into(),
                ));
            }
            (Some(c), None) => vec![c.as_str()],
            (None, Some(cs)) => cs.iter().map(String::as_str).collect(),
            (None, None) => Vec::new(),
        };

        let verdict = match def.action {
            Action::Deny => Verdict::Deny,
            Action::Permit => {
                if raw.is_empty() {
                    return Err(RuleError::Rule(
                        "permit rule needs one of command or commands".into(),
                    ));
                }
                let mut templates = Vec::with_capacity(raw.len());
                for text in raw {
                    let template = Template::parse(text, known).map_err(|reason| {
                        RuleError::Template {
                            template: text.to_string(),
                            reason,
                        }
                    })?;
                    if let Some(family) = condition.family() {
                        let other = match family {
                            Family::V4 => Family::V6,
                            Family::V6 => Family::V4,
                        };
                        if template.uses(other.source_placeholder()) {
                            return Err(RuleError::Template {
                                template: text.to_string(),
                                reason: format!(
                                    "{{{}}} used by a rule matching only {family} targets",
                                    other.source_placeholder()
                                ),
                            });
                        }
                    }
                    templates.push(template);
                }
                Verdict::Permit(templates)
            }
        };

        Ok(Self { condition, verdict })
    }
}

/// Rule compilation failure, before directive context is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    Rule(String),
    Template { template: String, reason: String },
}
