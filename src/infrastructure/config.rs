use crate::application::prerequisite_validator::Requirements;
use crate::domain::dashboard::{Placeholders, Transport, DEFAULT_DASHBOARD_NAME};
use crate::domain::workspace::{REQUIRED_SYSTEM_SCHEMAS, REQUIRED_SYSTEM_TABLES};
use anyhow::Context;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "config/workspace";
const ENV_PREFIX: &str = "LAKEVIEW";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub workspace: WorkspaceSettings,
    #[serde(default)]
    pub requirements: RequirementsSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(default)]
    pub table: TableSettings,
}

#[derive(Deserialize, Clone)]
pub struct WorkspaceSettings {
    pub host: Option<String>,
    pub token: Option<String>,
    /// Warehouse for SQL statements and new dashboards
    pub warehouse_id: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub statement_poll_interval_ms: u64,
    #[serde(default = "default_max_polls")]
    pub statement_max_polls: u32,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_polls() -> u32 {
    120
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            host: None,
            token: None,
            warehouse_id: None,
            statement_poll_interval_ms: default_poll_interval_ms(),
            statement_max_polls: default_max_polls(),
        }
    }
}

impl fmt::Debug for WorkspaceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceSettings")
            .field("host", &self.host)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("warehouse_id", &self.warehouse_id)
            .field("statement_poll_interval_ms", &self.statement_poll_interval_ms)
            .field("statement_max_polls", &self.statement_max_polls)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RequirementsSettings {
    #[serde(default = "default_system_schemas")]
    pub system_schemas: Vec<String>,
    #[serde(default = "default_system_tables")]
    pub system_tables: Vec<String>,
}

fn default_system_schemas() -> Vec<String> {
    REQUIRED_SYSTEM_SCHEMAS.iter().map(|s| s.to_string()).collect()
}

fn default_system_tables() -> Vec<String> {
    REQUIRED_SYSTEM_TABLES.iter().map(|s| s.to_string()).collect()
}

impl Default for RequirementsSettings {
    fn default() -> Self {
        Self {
            system_schemas: default_system_schemas(),
            system_tables: default_system_tables(),
        }
    }
}

impl From<RequirementsSettings> for Requirements {
    fn from(settings: RequirementsSettings) -> Self {
        Self {
            system_schemas: settings.system_schemas,
            system_tables: settings.system_tables,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardSettings {
    #[serde(default = "default_dashboard_name")]
    pub name: String,
    #[serde(default = "default_template")]
    pub template: PathBuf,
    pub parent_path: Option<String>,
    #[serde(default)]
    pub transport: Transport,
    pub placeholders: Option<Placeholders>,
}

fn default_dashboard_name() -> String {
    DEFAULT_DASHBOARD_NAME.to_string()
}

fn default_template() -> PathBuf {
    PathBuf::from("templates/better_sql_for_customers.lvdash.json")
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            name: default_dashboard_name(),
            template: default_template(),
            parent_path: None,
            transport: Transport::default(),
            placeholders: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TableSettings {
    #[serde(default = "default_comments_file")]
    pub comments_file: PathBuf,
}

fn default_comments_file() -> PathBuf {
    PathBuf::from("config/column_comments.json")
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            comments_file: default_comments_file(),
        }
    }
}

/// Host and token of the workspace to call
#[derive(Clone)]
pub struct Credentials {
    pub host: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl WorkspaceSettings {
    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        let host = self
            .host
            .as_deref()
            .map(normalize_host)
            .filter(|h| !h.is_empty())
            .context("Workspace host is not configured; set workspace.host or DATABRICKS_HOST")?;
        let token = self
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .context("Workspace token is not configured; set workspace.token or DATABRICKS_TOKEN")?;
        Ok(Credentials { host, token })
    }
}

/// Bare host name: no scheme, no trailing slash
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = host
        .strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host);
    host.trim_end_matches('/').to_string()
}

pub fn load_settings(path: &str) -> anyhow::Result<Settings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

/// `DATABRICKS_HOST` and `DATABRICKS_TOKEN` are fallbacks: the file and
/// `LAKEVIEW_*` variables take precedence over them.
pub fn load_settings_with(path: &str, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Settings> {
    let mut builder = config::Config::builder();
    if let Some(host) = lookup("DATABRICKS_HOST") {
        builder = builder.set_default("workspace.host", host)?;
    }
    if let Some(token) = lookup("DATABRICKS_TOKEN") {
        builder = builder.set_default("workspace.token", token)?;
    }

    let settings = builder
        .add_source(config::File::with_name(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .with_context(|| format!("Failed to load configuration from {}", path))?;

    Ok(settings.try_deserialize()?)
}
