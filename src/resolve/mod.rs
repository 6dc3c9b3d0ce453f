//! Resolution engine: (platform, directive, user input) to rendered commands.
//!
//! Resolution is a pure function of the registry and the query. It performs no
//! I/O, holds no state between calls, and never panics on user input.

pub mod context;
pub mod outcome;

pub use context::{Query, Sources};
pub use outcome::ResolvedCommands;

use std::collections::BTreeMap;

use crate::directive::Directive;
use crate::error::{FieldValidationError, ResolutionError};
use crate::field::{Family, FieldValue};
use crate::platform::{self, Interface};
use crate::registry::Registry;
use crate::rule::Verdict;
use crate::template::Template;

impl Registry {
    /// Resolve a query against this registry.
    ///
    /// Rules are tried in declared order and the first match decides.
    pub fn resolve(
        &self,
        query: &Query,
        sources: &Sources,
    ) -> Result<ResolvedCommands, ResolutionError> {
        let directive =
            self.lookup(&query.directive)
                .ok_or_else(|| ResolutionError::DirectiveNotFound {
                    id: query.directive.clone(),
                })?;
        if !directive.supports(&query.platform) {
            return Err(ResolutionError::PlatformMismatch {
                directive: directive.id().to_string(),
                platform: query.platform.clone(),
            });
        }

        let interface = platform::interface(&query.platform);
        let target = directive
            .target_field()
            .validate(&query.target, interface)?;
        let extra = validate_extra(directive, query, interface)?;

        for (index, rule) in directive.rules().iter().enumerate() {
            if !rule
                .condition
                .matches(&target, directive.target_field().name())?
            {
                continue;
            }
            log::debug!(
                "{}: rule {index} matched {target} ({:?})",
                directive.id(),
                rule.condition
            );
            return match &rule.verdict {
                Verdict::Deny => Err(ResolutionError::QueryDenied {
                    directive: directive.id().to_string(),
                    rule: index,
                }),
                Verdict::Permit(templates) => Ok(ResolvedCommands {
                    directive: directive.id().to_string(),
                    platform: query.platform.clone(),
                    rule: index,
                    commands: render(templates, &target, &extra, sources)?,
                }),
            };
        }

        Err(ResolutionError::NoApplicableRule {
            directive: directive.id().to_string(),
            target: target.canonical(),
        })
    }
}

/// Validate the additional fields in declaration order.
fn validate_extra<'d>(
    directive: &'d Directive,
    query: &Query,
    interface: Interface,
) -> Result<Vec<(&'d str, FieldValue)>, FieldValidationError> {
    for name in query.fields.keys() {
        if !directive.extra_fields().iter().any(|f| f.name() == name.as_str()) {
            log::debug!("{}: ignoring unknown field {name}", directive.id());
        }
    }
    directive
        .extra_fields()
        .iter()
        .map(|field| {
            let raw = query
                .fields
                .get(field.name())
                .ok_or_else(|| FieldValidationError::new(field.name(), "value is required"))?;
            Ok((field.name(), field.validate(raw, interface)?))
        })
        .collect()
}

fn render(
    templates: &[Template],
    target: &FieldValue,
    extra: &[(&str, FieldValue)],
    sources: &Sources,
) -> Result<Vec<String>, ResolutionError> {
    let mut values: BTreeMap<&str, String> = BTreeMap::new();
    values.insert("target", target.canonical());
    for (name, value) in extra {
        values.insert(*name, value.canonical());
    }

    for family in [Family::V4, Family::V6] {
        let placeholder = family.source_placeholder();
        if !templates.iter().any(|t| t.uses(placeholder)) {
            continue;
        }
        if target.family() != Some(family) {
            return Err(ResolutionError::SourceFamilyMismatch {
                placeholder: placeholder.to_string(),
                target: target.canonical(),
            });
        }
        let source = sources
            .get(family)
            .ok_or(ResolutionError::MissingSource { family })?;
        values.insert(placeholder, source);
    }

    templates
        .iter()
        .map(|t| {
            t.render(&values).map_err(|name| {
                FieldValidationError::new(&name, "value is required").into()
            })
        })
        .collect()
}
