//! Directives: named, platform-scoped query capabilities.
//!
//! [`DirectiveDef`] is the serialization contract shared by the built-in
//! catalogs and operator configuration. [`Directive`] is its compiled,
//! immutable form held by the registry.

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::field::{Field, FieldDef, TARGET};
use crate::rule::{Rule, RuleDef, RuleError};
use crate::template::AMBIENT;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DirectiveDef {
    pub id: String,
    pub name: String,
    /// Help text shown next to the query form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    pub platforms: Vec<String>,
    /// UI grouping labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleDef>,
}

impl DirectiveDef {
    /// `field` and `fields` together, singular first.
    pub fn all_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.field.iter().chain(self.fields.iter())
    }
}

/// A compiled directive. Never mutated after load.
#[derive(Debug, Clone)]
pub struct Directive {
    def: DirectiveDef,
    fields: Vec<Field>,
    rules: Vec<Rule>,
}

impl Directive {
    /// Compile and structurally validate a definition.
    pub fn compile(def: DirectiveDef) -> Result<Self, LoadError> {
        let id = def.id.clone();
        if id.trim().is_empty() {
            return Err(LoadError::EmptyId { name: def.name });
        }
        if def.platforms.is_empty() || def.platforms.iter().any(|p| p.trim().is_empty()) {
            return Err(LoadError::NoPlatforms { directive: id });
        }

        let fields = compile_fields(&def)?;

        let mut known: Vec<&str> = AMBIENT.to_vec();
        known.extend(fields.iter().skip(1).map(Field::name));

        let rules = def
            .rules
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                Rule::compile(rule, &known).map_err(|e| match e {
                    RuleError::Rule(reason) => LoadError::InvalidRule {
                        directive: id.clone(),
                        index,
                        reason,
                    },
                    RuleError::Template { template, reason } => LoadError::InvalidTemplate {
                        directive: id.clone(),
                        index,
                        template,
                        reason,
                    },
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { def, fields, rules })
    }

    pub fn id(&self) -> &str {
        &self.def.id
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn info(&self) -> Option<&str> {
        self.def.info.as_deref()
    }

    pub fn groups(&self) -> &[String] {
        &self.def.groups
    }

    pub fn platforms(&self) -> &[String] {
        &self.def.platforms
    }

    pub fn supports(&self, platform: &str) -> bool {
        self.def.platforms.iter().any(|p| p == platform)
    }

    /// The field the rules are evaluated against.
    pub fn target_field(&self) -> &Field {
        &self.fields[0]
    }

    /// Fields after the target, substituted by name.
    pub fn extra_fields(&self) -> &[Field] {
        &self.fields[1..]
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The definition this directive was compiled from.
    pub fn definition(&self) -> &DirectiveDef {
        &self.def
    }
}

fn compile_fields(def: &DirectiveDef) -> Result<Vec<Field>, LoadError> {
    let mut fields: Vec<Field> = Vec::new();
    for (i, field_def) in def.all_fields().enumerate() {
        let invalid = |reason: String| LoadError::InvalidField {
            directive: def.id.clone(),
            field: field_def.name.clone().unwrap_or_else(|| format!("#{i}")),
            reason,
        };
        if i > 0 {
            match field_def.name.as_deref() {
                None => return Err(invalid("additional fields need a name".into())),
                Some(name) if AMBIENT.contains(&name) => {
                    return Err(invalid(format!("{name} is reserved")));
                }
                Some(_) => {}
            }
        }
        let field = Field::compile(field_def, TARGET).map_err(invalid)?;
        if fields.iter().any(|f| f.name() == field.name()) {
            return Err(LoadError::DuplicateField {
                directive: def.id.clone(),
                field: field.name().to_string(),
            });
        }
        fields.push(field);
    }
    if fields.is_empty() {
        return Err(LoadError::NoFields {
            directive: def.id.clone(),
        });
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;
    use crate::rule::Action;

    fn text(name: Option<&str>) -> FieldDef {
        FieldDef {
            name: name.map(String::from),
            description: "test".into(),
            kind: FieldKind::Text {
                validation: None,
                max_length: None,
            },
        }
    }

    fn def(rules: Vec<RuleDef>) -> DirectiveDef {
        DirectiveDef {
            id: "test_directive".into(),
            name: "Test".into(),
            info: None,
            platforms: vec!["bird".into()],
            groups: vec![],
            field: Some(text(None)),
            fields: vec![],
            rules,
        }
    }

    #[test]
    fn compiles_minimal() {
        let d = Directive::compile(def(vec![
            RuleDef::new("*", Action::Permit).with_command("ping {target}"),
        ]))
        .unwrap();
        assert_eq!(d.id(), "test_directive");
        assert!(d.supports("bird"));
        assert!(!d.supports("frr"));
        assert_eq!(d.target_field().name(), "target");
        assert!(d.extra_fields().is_empty());
    }

    #[test]
    fn zero_rules_allowed() {
        let d = Directive::compile(def(vec![])).unwrap();
        assert!(d.rules().is_empty());
    }

    #[test]
    fn no_platforms_rejected() {
        let mut d = def(vec![]);
        d.platforms.clear();
        assert!(matches!(
            Directive::compile(d),
            Err(LoadError::NoPlatforms { .. })
        ));
    }

    #[test]
    fn no_fields_rejected() {
        let mut d = def(vec![]);
        d.field = None;
        assert!(matches!(
            Directive::compile(d),
            Err(LoadError::NoFields { .. })
        ));
    }

    #[test]
    fn field_and_fields_merge() {
        let mut d = def(vec![
            RuleDef::new("*", Action::Permit).with_command("show route {target} table {table}"),
        ]);
        d.fields = vec![text(Some("table"))];
        let d = Directive::compile(d).unwrap();
        assert_eq!(d.extra_fields()[0].name(), "table");
    }

    #[test]
    fn unnamed_extra_field_rejected() {
        let mut d = def(vec![]);
        d.fields = vec![text(None)];
        assert!(matches!(
            Directive::compile(d),
            Err(LoadError::InvalidField { .. })
        ));
    }

    #[test]
    fn reserved_extra_field_rejected() {
        let mut d = def(vec![]);
        d.fields = vec![text(Some("source4"))];
        assert!(Directive::compile(d).is_err());
    }

    #[test]
    fn duplicate_field_rejected() {
        let mut d = def(vec![]);
        d.fields = vec![text(Some("vrf")), text(Some("vrf"))];
        assert!(matches!(
            Directive::compile(d),
            Err(LoadError::DuplicateField { .. })
        ));
    }

    #[test]
    fn undeclared_placeholder_rejected() {
        let d = def(vec![
            RuleDef::new("*", Action::Permit).with_command("show route {target} table {table}"),
        ]);
        assert!(matches!(
            Directive::compile(d),
            Err(LoadError::InvalidTemplate { index: 0, .. })
        ));
    }

    #[test]
    fn malformed_rule_reports_index() {
        let mut both = RuleDef::new("*", Action::Permit).with_command("a {target}");
        both.commands = Some(vec!["b {target}".into()]);
        let d = def(vec![
            RuleDef::new("0.0.0.0/0", Action::Permit).with_command("ping {target}"),
            both,
        ]);
        match Directive::compile(d) {
            Err(LoadError::InvalidRule { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
