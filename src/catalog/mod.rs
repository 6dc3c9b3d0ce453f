//! Built-in directive catalogs, one embedded TOML file per platform.
//!
//! The catalog shape is the same one operators use for their own directives,
//! so a catalog serialized with [`Catalog::to_toml`] loads back unchanged.

/// Arista EOS directives.
pub mod arista_eos;
/// BIRD directives (birdc on the routing host).
pub mod bird;
/// Cisco IOS directives.
pub mod cisco_ios;
/// FRRouting directives (vtysh on the routing host).
pub mod frr;
/// Juniper Junos directives.
pub mod juniper;

use serde::{Deserialize, Serialize};

use crate::directive::DirectiveDef;
use crate::error::LoadError;

/// An ordered list of directive definitions.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Catalog {
    #[serde(default, rename = "directive")]
    pub directives: Vec<DirectiveDef>,
}

impl Catalog {
    /// Parse a catalog from TOML; `name` labels errors.
    pub fn parse(name: &str, source: &str) -> Result<Self, LoadError> {
        toml::from_str(source).map_err(|source| LoadError::Catalog {
            name: name.to_string(),
            source,
        })
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

/// Embedded catalog sources, in load order.
pub static BUILTINS: &[(&str, &str)] = &[
    ("arista_eos", arista_eos::SOURCE),
    ("bird", bird::SOURCE),
    ("cisco_ios", cisco_ios::SOURCE),
    ("frr", frr::SOURCE),
    ("juniper", juniper::SOURCE),
];

/// Parse every built-in catalog.
pub fn builtin() -> Result<Vec<Catalog>, LoadError> {
    BUILTINS
        .iter()
        .map(|(name, source)| Catalog::parse(name, source))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;

    #[test]
    fn all_builtins_parse() {
        let catalogs = builtin().unwrap();
        assert_eq!(catalogs.len(), BUILTINS.len());
        for (catalog, (name, _)) in catalogs.iter().zip(BUILTINS) {
            assert_eq!(catalog.directives.len(), 5, "{name}");
            for d in &catalog.directives {
                assert_eq!(d.platforms, vec![name.to_string()], "{}", d.id);
                assert!(d.id.starts_with(&format!("__hyperglass_{name}_")), "{}", d.id);
            }
        }
    }

    #[test]
    fn toml_round_trip() {
        for catalog in builtin().unwrap() {
            let text = catalog.to_toml().unwrap();
            let back = Catalog::parse("round-trip", &text).unwrap();
            assert_eq!(back, catalog);
        }
    }

    #[test]
    fn field_shorthand_parses() {
        let catalog = Catalog::parse(
            "inline",
            r#"
            [[directive]]
            id = "x"
            name = "X"
            platforms = ["bird"]
            field = { kind = "ip_address", description = "Prefix" }

            [[directive.fields]]
            name = "table"
            kind = "select"
            description = "Table"
            options = [{ value = "master4" }, { value = "master6", description = "IPv6" }]

            [[directive.rules]]
            action = "permit"
            command = "birdc show route {target} table {table}"
        "#,
        )
        .unwrap();
        let d = &catalog.directives[0];
        assert_eq!(
            d.field.as_ref().unwrap().kind,
            FieldKind::IpAddress { allow_prefix: true }
        );
        assert_eq!(d.fields[0].name.as_deref(), Some("table"));
        assert_eq!(d.rules[0].condition, "*");
    }

    #[test]
    fn parse_error_names_catalog() {
        let err = Catalog::parse("broken", "[[directive]]\nid = 1").unwrap_err();
        assert!(err.to_string().starts_with("catalog broken:"), "{err}");
    }
}
