// Dashboard domain model
use super::error::{BootstrapError, BootstrapResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

pub const CATALOG_TOKEN: &str = "CATALOG_NAME";
pub const SCHEMA_TOKEN: &str = "SCHEMA_NAME";
pub const TABLE_TOKEN: &str = "TABLE_NAME";

pub const DEFAULT_DASHBOARD_NAME: &str = "Better SQL for Customers";
pub const DASHBOARD_FILE_SUFFIX: &str = ".lvdash.json";

/// Values substituted for the template's placeholder tokens
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Placeholders {
    pub catalog: String,
    pub schema: String,
    pub table: String,
}

impl Placeholders {
    pub fn new(catalog: impl Into<String>, schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn apply(&self, query: &str) -> String {
        query
            .replace(CATALOG_TOKEN, &self.catalog)
            .replace(SCHEMA_TOKEN, &self.schema)
            .replace(TABLE_TOKEN, &self.table)
    }
}

/// A dashboard definition document. Unknown keys are kept verbatim so the
/// document round-trips to the platform untouched apart from dataset queries.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardTemplate {
    document: Value,
}

impl DashboardTemplate {
    pub fn from_value(document: Value, origin: &str) -> BootstrapResult<Self> {
        let datasets = document
            .get("datasets")
            .ok_or_else(|| BootstrapError::parse(origin, "missing `datasets` key"))?;
        if !datasets.is_array() {
            return Err(BootstrapError::parse(origin, "`datasets` must be an array"));
        }
        Ok(Self { document })
    }

    pub fn from_json_str(text: &str, origin: &str) -> BootstrapResult<Self> {
        let document: Value =
            serde_json::from_str(text).map_err(|e| BootstrapError::parse(origin, e))?;
        Self::from_value(document, origin)
    }

    pub fn load(path: &Path) -> BootstrapResult<Self> {
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| BootstrapError::parse(&origin, e))?;
        Self::from_json_str(&text, &origin)
    }

    /// Replace the placeholder tokens in every dataset query.
    /// Both the single `query` string and the `queryLines` form are rewritten.
    pub fn substitute(&mut self, placeholders: &Placeholders) {
        let Some(datasets) = self.document.get_mut("datasets").and_then(Value::as_array_mut) else {
            return;
        };

        for dataset in datasets {
            if let Some(Value::String(query)) = dataset.get_mut("query") {
                *query = placeholders.apply(query);
            }
            if let Some(Value::Array(lines)) = dataset.get_mut("queryLines") {
                for line in lines {
                    if let Value::String(text) = line {
                        *text = placeholders.apply(text);
                    }
                }
            }
        }
    }

    /// Compact JSON, as transmitted to the platform
    pub fn serialize(&self) -> String {
        self.document.to_string()
    }

    pub fn to_pretty_json(&self) -> BootstrapResult<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.document
            .serialize(&mut serializer)
            .map_err(|e| BootstrapError::parse("dashboard template", e))?;
        String::from_utf8(buffer).map_err(|e| BootstrapError::parse("dashboard template", e))
    }

    pub fn save(&self, path: &Path) -> BootstrapResult<()> {
        let text = self.to_pretty_json()?;
        std::fs::write(path, text).map_err(|source| BootstrapError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// The query text of every dataset, `queryLines` joined
    pub fn dataset_queries(&self) -> Vec<String> {
        let Some(datasets) = self.document.get("datasets").and_then(Value::as_array) else {
            return Vec::new();
        };

        datasets
            .iter()
            .filter_map(|dataset| {
                if let Some(query) = dataset.get("query").and_then(Value::as_str) {
                    return Some(query.to_string());
                }
                dataset.get("queryLines").and_then(Value::as_array).map(|lines| {
                    lines.iter().filter_map(Value::as_str).collect::<String>()
                })
            })
            .collect()
    }

    /// Placeholder tokens still present in any dataset query
    pub fn unresolved_tokens(&self) -> Vec<&'static str> {
        let queries = self.dataset_queries();
        [CATALOG_TOKEN, SCHEMA_TOKEN, TABLE_TOKEN]
            .into_iter()
            .filter(|token| queries.iter().any(|q| q.contains(token)))
            .collect()
    }

    #[cfg(test)]
    pub fn document(&self) -> &Value {
        &self.document
    }
}

/// A dashboard that exists on the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardHandle {
    pub dashboard_id: String,
    pub host: String,
}

impl DashboardHandle {
    pub fn new(dashboard_id: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            dashboard_id: dashboard_id.into(),
            host: host.into(),
        }
    }

    pub fn url(&self) -> String {
        build_url(&self.host, &self.dashboard_id)
    }
}

pub fn build_url(host: &str, dashboard_id: &str) -> String {
    format!("https://{}/sql/dashboardsv3/{}", host, dashboard_id)
}

/// Location of a dashboard as a workspace file
pub fn workspace_file_path(parent_path: &str, dashboard_name: &str) -> String {
    format!(
        "{}/{}{}",
        parent_path.trim_end_matches('/'),
        dashboard_name,
        DASHBOARD_FILE_SUFFIX
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(DashboardHandle),
    /// A same-named dashboard already lives under the parent path
    NameConflict { existing_id: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictDecision {
    Skip,
    UpdateWithId(String),
}

/// How dashboards are written to the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    /// Typed dashboard create/update calls
    #[default]
    Lakeview,
    /// Base64 file import through the generic workspace API
    WorkspaceImport,
}
