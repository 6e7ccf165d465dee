// Port traits for the workspace management surface
use crate::domain::error::BootstrapResult;
use crate::domain::workspace::{SystemSchema, WarehouseDescriptor};
use async_trait::async_trait;

/// The calling principal as reported by the identity service
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: String,
    pub user_name: String,
    pub groups: Vec<String>,
}

/// Request body for a new dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct NewDashboard {
    pub display_name: String,
    pub parent_path: String,
    pub serialized_dashboard: String,
    pub warehouse_id: Option<String>,
}

#[async_trait]
pub trait IdentityApi: Send + Sync {
    async fn current_user(&self) -> BootstrapResult<CurrentUser>;

    /// Id of the metastore assigned to the workspace
    async fn current_metastore_id(&self) -> BootstrapResult<String>;
}

#[async_trait]
pub trait MetadataApi: Send + Sync {
    async fn list_system_schemas(&self, metastore_id: &str) -> BootstrapResult<Vec<SystemSchema>>;

    async fn enable_system_schema(&self, metastore_id: &str, schema: &str) -> BootstrapResult<()>;

    async fn list_warehouses(&self) -> BootstrapResult<Vec<WarehouseDescriptor>>;

    /// Fully-qualified tables of `catalog` that any of `grantees` may select from
    async fn granted_tables(&self, catalog: &str, grantees: &[String]) -> BootstrapResult<Vec<String>>;

    async fn table_exists(&self, full_name: &str) -> BootstrapResult<bool>;
}

#[async_trait]
pub trait StatementApi: Send + Sync {
    /// Run one SQL statement to completion and return its rows
    async fn execute(&self, statement: &str) -> BootstrapResult<Vec<Vec<Option<String>>>>;
}

#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Returns the new dashboard id; a name collision is `BootstrapError::Conflict`
    async fn create_dashboard(&self, request: &NewDashboard) -> BootstrapResult<String>;

    async fn update_dashboard(
        &self,
        dashboard_id: &str,
        serialized_dashboard: &str,
        warehouse_id: Option<&str>,
    ) -> BootstrapResult<String>;

    /// Id of the dashboard with this display name under `parent_path`, if any
    async fn find_dashboard(&self, parent_path: &str, display_name: &str) -> BootstrapResult<Option<String>>;

    /// Raw content of a workspace file
    async fn export_file(&self, path: &str) -> BootstrapResult<String>;

    async fn import_file(&self, path: &str, content: &str, overwrite: bool) -> BootstrapResult<()>;

    /// Platform resource id behind a workspace path
    async fn resource_id(&self, path: &str) -> BootstrapResult<String>;
}
