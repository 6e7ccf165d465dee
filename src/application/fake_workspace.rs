// In-memory workspace used by the service tests
use super::workspace_api::{CurrentUser, DashboardApi, IdentityApi, MetadataApi, NewDashboard, StatementApi};
use crate::domain::error::{BootstrapError, BootstrapResult};
use crate::domain::workspace::{SystemSchema, WarehouseDescriptor};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDashboard {
    pub id: String,
    pub parent_path: String,
    pub display_name: String,
    pub serialized: String,
    pub warehouse_id: Option<String>,
}

pub struct FakeWorkspace {
    pub user: CurrentUser,
    pub metastore_id: String,
    pub schemas: Mutex<Vec<SystemSchema>>,
    pub warehouses: Vec<WarehouseDescriptor>,
    pub granted: Vec<String>,
    pub deny_schema_listing: bool,
    pub deny_privilege_query: bool,
    pub deny_warehouse_listing: bool,
    pub fail_statements: bool,
    pub tables: Mutex<HashSet<String>>,
    pub statements: Mutex<Vec<String>>,
    pub privilege_queries: Mutex<Vec<Vec<String>>>,
    pub dashboards: Mutex<Vec<StoredDashboard>>,
    pub files: Mutex<HashMap<String, String>>,
}

impl Default for FakeWorkspace {
    fn default() -> Self {
        Self {
            user: CurrentUser {
                id: "1001".to_string(),
                user_name: "ana@example.com".to_string(),
                groups: vec!["analysts".to_string()],
            },
            metastore_id: "ms-1".to_string(),
            schemas: Mutex::new(Vec::new()),
            warehouses: Vec::new(),
            granted: Vec::new(),
            deny_schema_listing: false,
            deny_privilege_query: false,
            deny_warehouse_listing: false,
            fail_statements: false,
            tables: Mutex::new(HashSet::new()),
            statements: Mutex::new(Vec::new()),
            privilege_queries: Mutex::new(Vec::new()),
            dashboards: Mutex::new(Vec::new()),
            files: Mutex::new(HashMap::new()),
        }
    }
}

impl FakeWorkspace {
    /// A workspace that satisfies every prerequisite
    pub fn ready() -> Self {
        Self {
            schemas: Mutex::new(
                ["billing", "compute", "access", "information_schema"]
                    .iter()
                    .map(|s| SystemSchema {
                        name: s.to_string(),
                        state: "ENABLE_COMPLETED".to_string(),
                    })
                    .collect(),
            ),
            warehouses: vec![WarehouseDescriptor::new("wh-2", "shared", "Large")],
            granted: vec![
                "system.access.audit".to_string(),
                "system.compute.clusters".to_string(),
                "system.billing.usage".to_string(),
            ],
            ..Self::default()
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn stored_dashboards(&self) -> Vec<StoredDashboard> {
        self.dashboards.lock().unwrap().clone()
    }

    pub fn insert_dashboard(&self, id: &str, parent_path: &str, display_name: &str, serialized: &str) {
        self.dashboards.lock().unwrap().push(StoredDashboard {
            id: id.to_string(),
            parent_path: parent_path.to_string(),
            display_name: display_name.to_string(),
            serialized: serialized.to_string(),
            warehouse_id: None,
        });
    }
}

#[async_trait]
impl IdentityApi for FakeWorkspace {
    async fn current_user(&self) -> BootstrapResult<CurrentUser> {
        Ok(self.user.clone())
    }

    async fn current_metastore_id(&self) -> BootstrapResult<String> {
        Ok(self.metastore_id.clone())
    }
}

#[async_trait]
impl MetadataApi for FakeWorkspace {
    async fn list_system_schemas(&self, _metastore_id: &str) -> BootstrapResult<Vec<SystemSchema>> {
        if self.deny_schema_listing {
            return Err(BootstrapError::AccessDenied("User does not have USE CATALOG on system".into()));
        }
        Ok(self.schemas.lock().unwrap().clone())
    }

    async fn enable_system_schema(&self, _metastore_id: &str, schema: &str) -> BootstrapResult<()> {
        let mut schemas = self.schemas.lock().unwrap();
        match schemas.iter_mut().find(|s| s.name == schema) {
            Some(existing) => existing.state = "ENABLE_COMPLETED".to_string(),
            None => schemas.push(SystemSchema {
                name: schema.to_string(),
                state: "ENABLE_COMPLETED".to_string(),
            }),
        }
        Ok(())
    }

    async fn list_warehouses(&self) -> BootstrapResult<Vec<WarehouseDescriptor>> {
        if self.deny_warehouse_listing {
            return Err(BootstrapError::AccessDenied("CAN_USE is required on at least one warehouse".into()));
        }
        Ok(self.warehouses.clone())
    }

    async fn granted_tables(&self, _catalog: &str, grantees: &[String]) -> BootstrapResult<Vec<String>> {
        self.privilege_queries.lock().unwrap().push(grantees.to_vec());
        if self.deny_privilege_query {
            return Err(BootstrapError::AccessDenied("table_privileges is not readable".into()));
        }
        Ok(self.granted.clone())
    }

    async fn table_exists(&self, full_name: &str) -> BootstrapResult<bool> {
        Ok(self.tables.lock().unwrap().contains(full_name))
    }
}

#[async_trait]
impl StatementApi for FakeWorkspace {
    async fn execute(&self, statement: &str) -> BootstrapResult<Vec<Vec<Option<String>>>> {
        if self.fail_statements {
            return Err(BootstrapError::AccessDenied("statement rejected".into()));
        }
        self.statements.lock().unwrap().push(statement.to_string());
        Ok(Vec::new())
    }
}

#[async_trait]
impl DashboardApi for FakeWorkspace {
    async fn create_dashboard(&self, request: &NewDashboard) -> BootstrapResult<String> {
        let mut dashboards = self.dashboards.lock().unwrap();
        if dashboards
            .iter()
            .any(|d| d.parent_path == request.parent_path && d.display_name == request.display_name)
        {
            return Err(BootstrapError::Conflict(format!(
                "Node named '{}' already exists",
                request.display_name
            )));
        }

        let id = format!("dash-{}", dashboards.len() + 1);
        dashboards.push(StoredDashboard {
            id: id.clone(),
            parent_path: request.parent_path.clone(),
            display_name: request.display_name.clone(),
            serialized: request.serialized_dashboard.clone(),
            warehouse_id: request.warehouse_id.clone(),
        });
        Ok(id)
    }

    async fn update_dashboard(
        &self,
        dashboard_id: &str,
        serialized_dashboard: &str,
        warehouse_id: Option<&str>,
    ) -> BootstrapResult<String> {
        let mut dashboards = self.dashboards.lock().unwrap();
        let dashboard = dashboards
            .iter_mut()
            .find(|d| d.id == dashboard_id)
            .ok_or_else(|| BootstrapError::NotFound(format!("dashboard {} does not exist", dashboard_id)))?;
        dashboard.serialized = serialized_dashboard.to_string();
        if let Some(warehouse_id) = warehouse_id {
            dashboard.warehouse_id = Some(warehouse_id.to_string());
        }
        Ok(dashboard.id.clone())
    }

    async fn find_dashboard(&self, parent_path: &str, display_name: &str) -> BootstrapResult<Option<String>> {
        Ok(self
            .dashboards
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.parent_path == parent_path && d.display_name == display_name)
            .map(|d| d.id.clone()))
    }

    async fn export_file(&self, path: &str) -> BootstrapResult<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| BootstrapError::NotFound(format!("Path ({}) doesn't exist", path)))
    }

    async fn import_file(&self, path: &str, content: &str, overwrite: bool) -> BootstrapResult<()> {
        let mut files = self.files.lock().unwrap();
        if !overwrite && files.contains_key(path) {
            return Err(BootstrapError::Conflict(format!("{} already exists", path)));
        }
        files.insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn resource_id(&self, path: &str) -> BootstrapResult<String> {
        let files = self.files.lock().unwrap();
        if files.contains_key(path) {
            Ok(format!("res-{}", path.len()))
        } else {
            Err(BootstrapError::NotFound(format!("Path ({}) doesn't exist", path)))
        }
    }
}
