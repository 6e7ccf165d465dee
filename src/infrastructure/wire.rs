// Request and response bodies of the workspace REST API
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error_code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScimUser {
    pub id: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(default)]
    pub groups: Vec<ScimGroup>,
}

#[derive(Debug, Deserialize)]
pub struct ScimGroup {
    pub display: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MetastoreAssignment {
    pub metastore_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SystemSchemaList {
    #[serde(default)]
    pub schemas: Vec<SystemSchemaEntry>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SystemSchemaEntry {
    pub schema: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WarehouseList {
    #[serde(default)]
    pub warehouses: Vec<WarehouseEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WarehouseEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cluster_size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TableExists {
    pub table_exists: bool,
}

#[derive(Debug, Serialize)]
pub struct StatementRequest<'a> {
    pub statement: &'a str,
    pub warehouse_id: &'a str,
    pub wait_timeout: &'static str,
    pub on_wait_timeout: &'static str,
    pub disposition: &'static str,
    pub format: &'static str,
}

impl<'a> StatementRequest<'a> {
    pub fn inline(statement: &'a str, warehouse_id: &'a str) -> Self {
        Self {
            statement,
            warehouse_id,
            wait_timeout: "30s",
            on_wait_timeout: "CONTINUE",
            disposition: "INLINE",
            format: "JSON_ARRAY",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatementResponse {
    pub statement_id: String,
    pub status: StatementStatus,
    #[serde(default)]
    pub result: Option<StatementResult>,
}

#[derive(Debug, Deserialize)]
pub struct StatementStatus {
    pub state: String,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

impl StatementStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self.state.as_str(), "PENDING" | "RUNNING")
    }
}

/// Inline result of a statement, also the shape of each further result chunk
#[derive(Debug, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub data_array: Vec<Vec<Option<String>>>,
    #[serde(default)]
    pub next_chunk_index: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CreateDashboardBody<'a> {
    pub display_name: &'a str,
    pub parent_path: &'a str,
    pub serialized_dashboard: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct UpdateDashboardBody<'a> {
    pub serialized_dashboard: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardBody {
    pub dashboard_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DashboardList {
    #[serde(default)]
    pub dashboards: Vec<DashboardSummary>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardSummary {
    pub dashboard_id: String,
    pub display_name: Option<String>,
    pub parent_path: Option<String>,
    pub path: Option<String>,
}

impl DashboardSummary {
    pub fn matches(&self, parent_path: &str, display_name: &str) -> bool {
        if self.display_name.as_deref() != Some(display_name) {
            return false;
        }
        let parent_path = parent_path.trim_end_matches('/');
        match (&self.parent_path, &self.path) {
            (Some(parent), _) => parent.trim_end_matches('/') == parent_path,
            (None, Some(path)) => path
                .rsplit_once('/')
                .map(|(dir, _)| dir == parent_path)
                .unwrap_or(false),
            (None, None) => false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportResponse {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ImportBody<'a> {
    pub path: &'a str,
    pub content: String,
    pub format: &'static str,
    pub overwrite: bool,
}

#[derive(Debug, Deserialize)]
pub struct ObjectStatus {
    pub resource_id: Option<String>,
    pub object_id: Option<i64>,
}
