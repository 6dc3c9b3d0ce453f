//! lg-directives: directive resolution and command construction for network
//! looking glass queries.
//!
//! A directive is a named query type ("BGP Route", "Ping") available on one
//! or more router platforms. Given a platform, a directive id and user input,
//! the engine validates the input, walks the directive's ordered rules to the
//! first match, and renders that rule's command templates into the exact
//! command strings to run on the device. It never executes anything.
//!
//! # Architecture
//!
//! - **[`field`]**: input field kinds, safety and per-kind validation.
//! - **[`rule`]**: rule conditions (CIDR, pattern, exact, wildcard) and verdicts.
//! - **[`template`]**: `{placeholder}` command templates, checked at load.
//! - **[`directive`]**: directive definitions and their compiled form.
//! - **[`catalog`]**: built-in per-platform directive catalogs (embedded TOML).
//! - **[`registry`]**: the loaded directive set, plus a swappable shared handle.
//! - **[`resolve`]**: the resolution engine.
//! - **[`platform`]**: platform capability lookup.
//! - **[`config`]**: embedded defaults + user overlay merge.
//! - **[`logging`]**: file logging and the per-query audit line.

/// Built-in directive catalogs.
pub mod catalog;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
pub mod directive;
pub mod error;
pub mod field;
/// File-based resolution logging.
pub mod logging;
pub mod platform;
pub mod registry;
pub mod resolve;
pub mod rule;
pub mod template;

pub use error::{ConfigError, FieldValidationError, LoadError, ResolutionError};
pub use registry::{Overrides, Registry, SharedRegistry};
pub use resolve::{Query, ResolvedCommands, Sources};

/// Resolve a query against the built-in catalogs only.
///
/// This is the main entry point for tests and simple usage.
/// For operator overrides, build the registry from [`config::Config`].
pub fn resolve(query: &Query, sources: &Sources) -> Result<ResolvedCommands, ResolutionError> {
    let registry = Registry::builtin().expect("built-in catalogs must load");
    registry.resolve(query, sources)
}
