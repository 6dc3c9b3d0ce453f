use serde::Serialize;

/// Commands produced for a permitted query, in execution order.
///
/// The directive id, platform and matching rule travel with the commands for auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCommands {
    pub directive: String,
    pub platform: String,
    /// Index of the rule that permitted the query.
    pub rule: usize,
    pub commands: Vec<String>,
}
