/// Embedded catalog source.
pub const SOURCE: &str = include_str!("../../catalogs/arista_eos.toml");
