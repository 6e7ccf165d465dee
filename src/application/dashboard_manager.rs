// Dashboard manager - Template handling and dashboard create/update/export/import
use crate::application::workspace_api::{DashboardApi, NewDashboard};
use crate::domain::dashboard::{
    workspace_file_path, CreateOutcome, DashboardHandle, DashboardTemplate, Placeholders, Transport,
};
use crate::domain::error::{BootstrapError, BootstrapResult};
use std::path::Path;
use std::sync::Arc;

pub struct DashboardManager {
    api: Arc<dyn DashboardApi>,
    host: String,
    transport: Transport,
    template: Option<DashboardTemplate>,
}

impl DashboardManager {
    pub fn new(api: Arc<dyn DashboardApi>, host: impl Into<String>, transport: Transport) -> Self {
        Self {
            api,
            host: host.into(),
            transport,
            template: None,
        }
    }

    pub fn template(&self) -> Option<&DashboardTemplate> {
        self.template.as_ref()
    }

    pub fn set_template(&mut self, template: DashboardTemplate) {
        self.template = Some(template);
    }

    /// Load a template from disk. The held template only changes on success.
    pub fn load_template(&mut self, path: &Path) -> BootstrapResult<&DashboardTemplate> {
        let template = DashboardTemplate::load(path)?;
        tracing::debug!(
            "Loaded dashboard template {} with {} datasets",
            path.display(),
            template.dataset_queries().len()
        );
        Ok(self.template.insert(template))
    }

    pub fn substitute_placeholders(&mut self, placeholders: &Placeholders) -> BootstrapResult<()> {
        self.loaded_mut()?.substitute(placeholders);
        Ok(())
    }

    pub fn save_local(&self, path: &Path) -> BootstrapResult<()> {
        self.loaded()?.save(path)
    }

    /// Fails when a dataset query still carries a placeholder token
    pub fn ensure_resolved(&self) -> BootstrapResult<()> {
        let unresolved = self.loaded()?.unresolved_tokens();
        if unresolved.is_empty() {
            return Ok(());
        }
        Err(BootstrapError::MissingResource(format!(
            "dataset queries still contain {}; set --catalog, --schema and --table \
             or [dashboard.placeholders] in the configuration",
            unresolved.join(", ")
        )))
    }

    fn loaded(&self) -> BootstrapResult<&DashboardTemplate> {
        self.template
            .as_ref()
            .ok_or_else(|| BootstrapError::MissingResource("no dashboard template loaded".into()))
    }

    fn loaded_mut(&mut self) -> BootstrapResult<&mut DashboardTemplate> {
        self.template
            .as_mut()
            .ok_or_else(|| BootstrapError::MissingResource("no dashboard template loaded".into()))
    }

    fn handle(&self, dashboard_id: String) -> DashboardHandle {
        DashboardHandle::new(dashboard_id, self.host.clone())
    }

    /// Create a dashboard from the held template. A same-named dashboard under
    /// `parent_path` is reported as `NameConflict` and left untouched.
    pub async fn create(
        &self,
        parent_path: &str,
        name: &str,
        warehouse_id: Option<&str>,
    ) -> BootstrapResult<CreateOutcome> {
        let serialized = self.loaded()?.serialize();

        match self.transport {
            Transport::Lakeview => {
                let request = NewDashboard {
                    display_name: name.to_string(),
                    parent_path: parent_path.to_string(),
                    serialized_dashboard: serialized,
                    warehouse_id: warehouse_id.map(str::to_string),
                };

                match self.api.create_dashboard(&request).await {
                    Ok(id) => Ok(CreateOutcome::Created(self.handle(id))),
                    Err(BootstrapError::Conflict(message)) => {
                        tracing::info!("Dashboard '{}' already exists: {}", name, message);
                        let existing_id = match self.api.find_dashboard(parent_path, name).await {
                            Ok(id) => id,
                            Err(e) => {
                                tracing::warn!("Could not look up the existing dashboard id: {}", e);
                                None
                            }
                        };
                        Ok(CreateOutcome::NameConflict { existing_id })
                    }
                    Err(e) => Err(e),
                }
            }
            Transport::WorkspaceImport => {
                let path = workspace_file_path(parent_path, name);
                match self.api.import_file(&path, &serialized, false).await {
                    Ok(()) => {
                        let id = self.api.resource_id(&path).await?;
                        Ok(CreateOutcome::Created(self.handle(id)))
                    }
                    Err(BootstrapError::Conflict(message)) => {
                        tracing::info!("Workspace file {} already exists: {}", path, message);
                        let existing_id = self.api.resource_id(&path).await.ok();
                        Ok(CreateOutcome::NameConflict { existing_id })
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Overwrite the definition of an existing dashboard with the held template
    pub async fn update(&self, dashboard_id: &str, warehouse_id: Option<&str>) -> BootstrapResult<DashboardHandle> {
        let serialized = self.loaded()?.serialize();
        self.update_serialized(dashboard_id, &serialized, warehouse_id).await
    }

    pub async fn update_serialized(
        &self,
        dashboard_id: &str,
        serialized_dashboard: &str,
        warehouse_id: Option<&str>,
    ) -> BootstrapResult<DashboardHandle> {
        let id = self
            .api
            .update_dashboard(dashboard_id, serialized_dashboard, warehouse_id)
            .await?;
        Ok(self.handle(id))
    }

    /// Fetch a dashboard definition through the workspace file API
    pub async fn export(&self, parent_path: &str, name: &str) -> BootstrapResult<DashboardTemplate> {
        let path = workspace_file_path(parent_path, name);
        let content = self.api.export_file(&path).await?;
        DashboardTemplate::from_json_str(&content, &path)
    }

    /// Write a dashboard definition through the workspace file API, replacing any existing file
    pub async fn import(
        &self,
        parent_path: &str,
        name: &str,
        document: &DashboardTemplate,
    ) -> BootstrapResult<DashboardHandle> {
        let path = workspace_file_path(parent_path, name);
        self.api.import_file(&path, &document.serialize(), true).await?;
        let id = self.api.resource_id(&path).await?;
        Ok(self.handle(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fake_workspace::FakeWorkspace;
    use std::io::Write;

    const HOST: &str = "adb-1.azuredatabricks.net";
    const TEMPLATE: &str = r#"{"datasets":[{"name":"usage","query":"SELECT * FROM CATALOG_NAME.SCHEMA_NAME.TABLE_NAME"}]}"#;

    fn template_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    fn loaded_manager(workspace: Arc<FakeWorkspace>, transport: Transport) -> DashboardManager {
        let file = template_file(TEMPLATE);
        let mut manager = DashboardManager::new(workspace, HOST, transport);
        manager.load_template(file.path()).unwrap();
        manager
            .substitute_placeholders(&Placeholders::new("main", "ops", "usage"))
            .unwrap();
        manager
    }

    #[tokio::test]
    async fn test_create_then_conflict_then_update() {
        let workspace = Arc::new(FakeWorkspace::default());
        let manager = loaded_manager(workspace.clone(), Transport::Lakeview);

        let handle = match manager.create("/Users/ana", "Usage", Some("wh-2")).await.unwrap() {
            CreateOutcome::Created(handle) => handle,
            other => panic!("expected a created dashboard, got {:?}", other),
        };
        assert_eq!(handle.url(), format!("https://{}/sql/dashboardsv3/dash-1", HOST));
        let stored = workspace.stored_dashboards();
        assert!(stored[0].serialized.contains("main.ops.usage"));
        assert_eq!(stored[0].warehouse_id.as_deref(), Some("wh-2"));

        let mut other = DashboardTemplate::from_json_str(r#"{"datasets":[{"query":"SELECT 2"}]}"#, "inline").unwrap();
        other.substitute(&Placeholders::new("a", "b", "c"));
        let mut second = DashboardManager::new(workspace.clone(), HOST, Transport::Lakeview);
        second.set_template(other);

        let outcome = second.create("/Users/ana", "Usage", None).await.unwrap();
        assert_eq!(
            outcome,
            CreateOutcome::NameConflict {
                existing_id: Some("dash-1".to_string())
            }
        );
        assert!(workspace.stored_dashboards()[0].serialized.contains("main.ops.usage"));

        let handle = second.update("dash-1", None).await.unwrap();
        assert_eq!(handle, DashboardHandle::new("dash-1", HOST));
        assert!(workspace.stored_dashboards()[0].serialized.contains("SELECT 2"));
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let manager = loaded_manager(Arc::new(FakeWorkspace::default()), Transport::Lakeview);
        let err = manager.update("missing", None).await.unwrap_err();
        assert!(matches!(err, BootstrapError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_load_keeps_no_partial_state() {
        let mut manager = DashboardManager::new(Arc::new(FakeWorkspace::default()), HOST, Transport::Lakeview);
        let file = template_file(r#"{"pages": []}"#);

        let err = manager.load_template(file.path()).unwrap_err();
        assert!(matches!(err, BootstrapError::Parse { .. }));
        assert!(manager.template().is_none());

        let err = manager.create("/Users/ana", "Usage", None).await.unwrap_err();
        assert!(matches!(err, BootstrapError::MissingResource(_)));
    }

    #[tokio::test]
    async fn test_workspace_import_transport() {
        let workspace = Arc::new(FakeWorkspace::default());
        let manager = loaded_manager(workspace.clone(), Transport::WorkspaceImport);
        let path = "/Users/ana/Usage.lvdash.json";

        let outcome = manager.create("/Users/ana", "Usage", None).await.unwrap();
        assert!(matches!(outcome, CreateOutcome::Created(_)));
        assert!(workspace.files.lock().unwrap()[path].contains("main.ops.usage"));

        let outcome = manager.create("/Users/ana", "Usage", None).await.unwrap();
        assert_eq!(
            outcome,
            CreateOutcome::NameConflict {
                existing_id: Some(format!("res-{}", path.len()))
            }
        );
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let workspace = Arc::new(FakeWorkspace::default());
        let manager = loaded_manager(workspace.clone(), Transport::Lakeview);
        let document = manager.template().unwrap().clone();

        let handle = manager.import("/Users/ana", "Usage", &document).await.unwrap();
        assert_eq!(handle.host, HOST);
        // import overwrites
        manager.import("/Users/ana", "Usage", &document).await.unwrap();

        let exported = manager.export("/Users/ana", "Usage").await.unwrap();
        assert_eq!(exported, document);

        let err = manager.export("/Users/ana", "Other").await.unwrap_err();
        assert!(matches!(err, BootstrapError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_save_local_writes_held_template() {
        let manager = loaded_manager(Arc::new(FakeWorkspace::default()), Transport::Lakeview);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("copy.lvdash.json");

        manager.save_local(&path).unwrap();
        let saved = DashboardTemplate::load(&path).unwrap();
        assert_eq!(saved.dataset_queries(), vec!["SELECT * FROM main.ops.usage".to_string()]);
    }

    #[test]
    fn test_ensure_resolved_names_leftover_tokens() {
        let workspace = Arc::new(FakeWorkspace::default());
        assert!(loaded_manager(workspace.clone(), Transport::Lakeview).ensure_resolved().is_ok());

        let file = template_file(TEMPLATE);
        let mut raw = DashboardManager::new(workspace, HOST, Transport::Lakeview);
        raw.load_template(file.path()).unwrap();
        match raw.ensure_resolved() {
            Err(BootstrapError::MissingResource(message)) => {
                assert!(message.contains("CATALOG_NAME, SCHEMA_NAME, TABLE_NAME"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
