//! Directive registry: every built-in and operator-defined directive, indexed
//! by id and by platform.
//!
//! A [`Registry`] is built once and never mutated. [`SharedRegistry`] hands
//! out snapshots and swaps in a freshly loaded registry as a whole, so a
//! concurrent resolution sees either the old set of directives or the new one.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::catalog::{self, Catalog};
use crate::directive::{Directive, DirectiveDef};
use crate::error::LoadError;
use crate::platform;

/// Operator changes applied on top of the built-in catalogs.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Drop every built-in directive.
    pub replace: bool,
    /// Built-in ids to drop.
    pub remove: Vec<String>,
    /// Directives to add; an id equal to a built-in replaces it in place.
    pub directives: Vec<DirectiveDef>,
}

#[derive(Debug)]
pub struct Registry {
    directives: Vec<Directive>,
    by_id: HashMap<String, usize>,
    by_platform: HashMap<String, Vec<usize>>,
}

impl Registry {
    /// Build a registry from built-in catalogs and operator overrides.
    ///
    /// Built-ins keep catalog order; replacements keep the slot of the
    /// directive they replace and new directives are appended.
    pub fn load(builtins: Vec<Catalog>, overrides: Overrides) -> Result<Self, LoadError> {
        let mut defs: Vec<DirectiveDef> = Vec::new();

        if overrides.replace {
            log::info!("built-in directives replaced by configuration");
        } else {
            for def in builtins.into_iter().flat_map(|c| c.directives) {
                if defs.iter().any(|d| d.id == def.id) {
                    return Err(LoadError::DuplicateId { id: def.id });
                }
                defs.push(def);
            }
        }

        for id in &overrides.remove {
            let before = defs.len();
            defs.retain(|d| &d.id != id);
            if defs.len() == before {
                log::warn!("cannot remove directive {id}: no such built-in");
            } else {
                log::info!("removed built-in directive {id}");
            }
        }

        let mut seen: Vec<&str> = Vec::new();
        for def in &overrides.directives {
            if seen.contains(&def.id.as_str()) {
                return Err(LoadError::DuplicateId { id: def.id.clone() });
            }
            seen.push(&def.id);
        }
        for def in overrides.directives {
            match defs.iter().position(|d| d.id == def.id) {
                Some(pos) => {
                    log::info!("directive {} overrides built-in", def.id);
                    defs[pos] = def;
                }
                None => {
                    log::debug!("directive {} added by configuration", def.id);
                    defs.push(def);
                }
            }
        }

        let directives = defs
            .into_iter()
            .map(Directive::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::index(directives))
    }

    /// The registry of built-in catalogs only.
    pub fn builtin() -> Result<Self, LoadError> {
        Self::load(catalog::builtin()?, Overrides::default())
    }

    fn index(directives: Vec<Directive>) -> Self {
        let mut by_id = HashMap::with_capacity(directives.len());
        let mut by_platform: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, d) in directives.iter().enumerate() {
            by_id.insert(d.id().to_string(), i);
            for p in d.platforms() {
                if platform::lookup(p).is_none() {
                    log::warn!("directive {} targets unknown platform {p}", d.id());
                }
                let slots = by_platform.entry(p.clone()).or_default();
                if !slots.contains(&i) {
                    slots.push(i);
                }
            }
        }
        Self {
            directives,
            by_id,
            by_platform,
        }
    }

    pub fn lookup(&self, id: &str) -> Option<&Directive> {
        self.by_id.get(id).map(|&i| &self.directives[i])
    }

    /// Directives valid on `platform`, in load order.
    pub fn for_platform(&self, platform: &str) -> Vec<&Directive> {
        self.by_platform
            .get(platform)
            .map(|slots| slots.iter().map(|&i| &self.directives[i]).collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Directive> {
        self.directives.iter()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// The effective directive set in catalog form.
    pub fn to_catalog(&self) -> Catalog {
        Catalog {
            directives: self.iter().map(|d| d.definition().clone()).collect(),
        }
    }
}

/// A registry handle shared between concurrent resolutions and reloads.
#[derive(Debug)]
pub struct SharedRegistry {
    current: RwLock<Arc<Registry>>,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// The registry installed right now. Holding the snapshot keeps it alive
    /// across a concurrent reload.
    pub fn snapshot(&self) -> Arc<Registry> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Install a new registry, returning the one it replaced.
    pub fn install(&self, registry: Registry) -> Arc<Registry> {
        let next = Arc::new(registry);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }

    /// Load a new registry and install it. On error the current registry stays.
    pub fn reload(&self, builtins: Vec<Catalog>, overrides: Overrides) -> Result<(), LoadError> {
        let registry = Registry::load(builtins, overrides)?;
        let count = registry.len();
        self.install(registry);
        log::info!("registry reloaded: {count} directives");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDef, FieldKind};
    use crate::rule::{Action, RuleDef};

    fn def(id: &str, platforms: &[&str], command: &str) -> DirectiveDef {
        DirectiveDef {
            id: id.into(),
            name: id.into(),
            info: None,
            platforms: platforms.iter().map(|p| p.to_string()).collect(),
            groups: vec![],
            field: Some(FieldDef {
                name: None,
                description: "target".into(),
                kind: FieldKind::Text {
                    validation: None,
                    max_length: None,
                },
            }),
            fields: vec![],
            rules: vec![RuleDef::new("*", Action::Permit).with_command(command)],
        }
    }

    fn catalog(defs: Vec<DirectiveDef>) -> Catalog {
        Catalog { directives: defs }
    }

    fn single(id: &str) -> Registry {
        let command = format!("{id} {{target}}");
        Registry::load(
            vec![catalog(vec![def(id, &["bird"], &command)])],
            Overrides::default(),
        )
        .unwrap()
    }

    #[test]
    fn builtin_loads() {
        let reg = Registry::builtin().unwrap();
        assert_eq!(reg.len(), 25);
        assert!(reg.lookup("__hyperglass_bird_bgp_route__").is_some());
        assert!(reg.lookup("missing").is_none());
    }

    #[test]
    fn every_platform_lists_its_directives() {
        let reg = Registry::builtin().unwrap();
        for d in reg.iter() {
            for p in d.platforms() {
                assert!(
                    reg.for_platform(p).iter().any(|x| x.id() == d.id()),
                    "{} missing from {p}",
                    d.id()
                );
            }
        }
        assert!(reg.for_platform("nokia_sros").is_empty());
    }

    #[test]
    fn every_rule_has_commands_or_denies() {
        use crate::rule::Verdict;
        let reg = Registry::builtin().unwrap();
        for d in reg.iter() {
            for r in d.rules() {
                if let Verdict::Permit(t) = &r.verdict {
                    assert!(!t.is_empty(), "{}", d.id());
                }
            }
        }
    }

    #[test]
    fn duplicate_builtin_ids_rejected() {
        let err = Registry::load(
            vec![
                catalog(vec![def("a", &["bird"], "x {target}")]),
                catalog(vec![def("a", &["frr"], "y {target}")]),
            ],
            Overrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::DuplicateId { ref id } if id == "a"));
    }

    #[test]
    fn duplicate_override_ids_rejected() {
        let overrides = Overrides {
            directives: vec![def("b", &["bird"], "x {target}"), def("b", &["bird"], "y {target}")],
            ..Overrides::default()
        };
        assert!(matches!(
            Registry::load(vec![], overrides),
            Err(LoadError::DuplicateId { .. })
        ));
    }

    #[test]
    fn override_replaces_in_place() {
        let overrides = Overrides {
            directives: vec![
                def("a", &["bird"], "new {target}"),
                def("c", &["bird"], "c {target}"),
            ],
            ..Overrides::default()
        };
        let reg = Registry::load(
            vec![catalog(vec![
                def("a", &["bird"], "old {target}"),
                def("b", &["bird"], "b {target}"),
            ])],
            overrides,
        )
        .unwrap();
        let ids: Vec<_> = reg.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        let rule = &reg.lookup("a").unwrap().definition().rules[0];
        assert_eq!(rule.command.as_deref(), Some("new {target}"));
    }

    #[test]
    fn remove_and_replace() {
        let builtins = || {
            vec![catalog(vec![
                def("a", &["bird"], "a {target}"),
                def("b", &["bird"], "b {target}"),
            ])]
        };

        let reg = Registry::load(
            builtins(),
            Overrides {
                remove: vec!["a".into(), "zzz".into()],
                ..Overrides::default()
            },
        )
        .unwrap();
        assert!(reg.lookup("a").is_none());
        assert!(reg.lookup("b").is_some());

        let reg = Registry::load(
            builtins(),
            Overrides {
                replace: true,
                directives: vec![def("own", &["bird"], "own {target}")],
                ..Overrides::default()
            },
        )
        .unwrap();
        assert_eq!(reg.len(), 1);
        assert!(reg.lookup("own").is_some());
    }

    #[test]
    fn malformed_rule_refuses_load() {
        let mut bad = def("bad", &["bird"], "x {target}");
        bad.rules[0].commands = Some(vec!["y {target}".into()]);
        let err = Registry::load(vec![catalog(vec![bad])], Overrides::default()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidRule { .. }));

        let mut neither = def("neither", &["bird"], "x {target}");
        neither.rules[0].command = None;
        assert!(Registry::load(vec![catalog(vec![neither])], Overrides::default()).is_err());
    }

    #[test]
    fn to_catalog_round_trips() {
        let reg = Registry::builtin().unwrap();
        let text = reg.to_catalog().to_toml().unwrap();
        let again = Registry::load(
            vec![Catalog::parse("dump", &text).unwrap()],
            Overrides::default(),
        )
        .unwrap();
        assert_eq!(again.to_catalog(), reg.to_catalog());
    }

    #[test]
    fn failed_reload_keeps_current() {
        let shared = SharedRegistry::new(single("a"));
        let mut bad = def("b", &["bird"], "b {target}");
        bad.platforms.clear();
        assert!(shared.reload(vec![catalog(vec![bad])], Overrides::default()).is_err());
        assert!(shared.snapshot().lookup("a").is_some());

        shared
            .reload(
                vec![catalog(vec![def("b", &["bird"], "b {target}")])],
                Overrides::default(),
            )
            .unwrap();
        let snap = shared.snapshot();
        assert!(snap.lookup("a").is_none());
        assert!(snap.lookup("b").is_some());
    }

    #[test]
    fn snapshot_survives_reload() {
        let shared = SharedRegistry::new(single("a"));
        let old = shared.snapshot();
        let replaced = shared.install(single("b"));
        assert!(Arc::ptr_eq(&old, &replaced));
        assert!(old.lookup("a").is_some());
        assert!(shared.snapshot().lookup("b").is_some());
    }
}
