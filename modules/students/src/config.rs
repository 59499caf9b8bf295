use serde::{Deserialize, Serialize};

/// How the store hands out database handles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    /// Open a fresh connection for every request.
    #[default]
    PerRequest,
    /// Open once at startup and reuse it.
    Shared,
}

/// Configuration for the students module (`modules.students`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudentsConfig {
    /// Also mount the unscoped routes (`POST /student`, `GET|PUT|DELETE /{name}`).
    #[serde(default = "default_legacy_routes")]
    pub legacy_routes: bool,
    #[serde(default)]
    pub connection: ConnectionMode,
}

impl Default for StudentsConfig {
    fn default() -> Self {
        Self {
            legacy_routes: default_legacy_routes(),
            connection: ConnectionMode::default(),
        }
    }
}

fn default_legacy_routes() -> bool {
    true
}
