//! lg-directives: resolve a looking glass query into device commands.
//!
//! Reads a JSON query from stdin, writes the rendered commands (or the
//! reason the query was refused) as JSON to stdout.
//!
//!   {"platform": "bird", "directive": "__hyperglass_bird_ping__", "target": "192.0.2.1"}
//!
//! Flags:
//!   --list <platform>   directives available on a platform, as JSON
//!   --dump              the effective directive catalog, as TOML

use std::collections::BTreeMap;
use std::io::Read;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::Deserialize;

use lg_directives::config::Config;
use lg_directives::{
    Query, Registry, ResolutionError, ResolvedCommands, Sources, catalog, logging, platform,
};

const USAGE: &str = "usage: lg-directives [--list <platform> | --dump] < query.json";

#[derive(Deserialize)]
struct QueryInput {
    platform: String,
    directive: String,
    target: String,
    #[serde(default)]
    fields: BTreeMap<String, String>,
    source4: Option<Ipv4Addr>,
    source6: Option<Ipv6Addr>,
}

impl QueryInput {
    fn split(self) -> (Query, Sources) {
        let query = Query {
            platform: self.platform,
            directive: self.directive,
            target: self.target,
            fields: self.fields,
        };
        let sources = Sources {
            source4: self.source4,
            source6: self.source6,
        };
        (query, sources)
    }
}

fn render_output(result: &Result<ResolvedCommands, ResolutionError>) -> serde_json::Value {
    match result {
        Ok(r) => serde_json::json!({
            "directive": r.directive,
            "platform": r.platform,
            "commands": r.commands,
        }),
        Err(e) => serde_json::json!({
            "error": {
                "kind": e.kind(),
                "message": e.to_string(),
            }
        }),
    }
}

fn list(registry: &Registry, platform_id: &str) -> serde_json::Value {
    let directives: Vec<_> = registry
        .for_platform(platform_id)
        .into_iter()
        .map(|d| {
            serde_json::json!({
                "id": d.id(),
                "name": d.name(),
                "groups": d.groups(),
                "info": d.info(),
            })
        })
        .collect();
    serde_json::json!({
        "platform": platform_id,
        "name": platform::display_name(platform_id),
        "interface": platform::interface(platform_id),
        "directives": directives,
    })
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{msg}");
    std::process::exit(1);
}

// ─── Entry point ─────────────────────────────────────

fn main() {
    let config = Config::load().unwrap_or_else(|e| fail(e));
    let level = config.log_level().unwrap_or_else(|e| fail(e));
    logging::init(level, &config.log_path());

    let builtins = catalog::builtin().unwrap_or_else(|e| fail(e));
    let registry = Registry::load(builtins, config.overrides()).unwrap_or_else(|e| fail(e));

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] => {}
        ["--dump"] => {
            let text = registry.to_catalog().to_toml().unwrap_or_else(|e| fail(e));
            print!("{text}");
            return;
        }
        ["--list", platform_id] => {
            println!("{}", list(&registry, platform_id));
            return;
        }
        ["--help" | "-h"] => {
            println!("{USAGE}");
            return;
        }
        _ => fail(USAGE),
    }

    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        fail("failed to read stdin");
    }

    let query_input: QueryInput = match serde_json::from_str(&input) {
        Ok(v) => v,
        Err(e) => fail(format!("JSON parse error: {e}")),
    };
    let (query, sources) = query_input.split();
    let sources = sources.or(config.sources());

    let result = registry.resolve(&query, &sources);
    logging::log_resolution(&query, &result);

    println!("{}", render_output(&result));
}
