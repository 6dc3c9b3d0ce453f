use std::fs::OpenOptions;
use std::path::Path;

use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};

use crate::error::ResolutionError;
use crate::resolve::{Query, ResolvedCommands};

/// Log target for the one-line-per-query audit record.
pub const AUDIT_TARGET: &str = "lg_directives::audit";

/// Route `log` records to an append-only file.
/// Best-effort: returns false if the file cannot be opened (logging must never block resolution).
pub fn init(level: LevelFilter, path: &Path) -> bool {
    if let Some(dir) = path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return false;
    };
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    WriteLogger::init(level, config, file).is_ok()
}

/// Emit the audit record for one resolution.
pub fn log_resolution(query: &Query, result: &Result<ResolvedCommands, ResolutionError>) {
    let (outcome, detail) = audit_fields(result);
    let target: String = query.target.chars().take(200).collect();
    log::info!(
        target: AUDIT_TARGET,
        "{platform}\t{directive}\t{outcome}\t{target:?}\t{detail}",
        platform = query.platform,
        directive = query.directive,
    );
}

fn audit_fields(result: &Result<ResolvedCommands, ResolutionError>) -> (&'static str, String) {
    match result {
        // Compact single-line command list for the log
        Ok(r) => ("permit", r.commands.join(" ;; ").replace('\n', " ")),
        Err(e) => (e.kind(), e.to_string().replace('\n', "; ")),
    }
}
