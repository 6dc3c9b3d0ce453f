/// Embedded catalog source.
pub const SOURCE: &str = include_str!("../../catalogs/cisco_ios.toml");
