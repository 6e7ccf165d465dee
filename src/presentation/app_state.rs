// Shared state for command handlers
use crate::application::admin_service::AdminService;
use crate::application::context_resolver::ContextResolver;
use crate::application::dashboard_manager::DashboardManager;
use crate::application::prerequisite_validator::{PrerequisiteValidator, Requirements};
use crate::application::table_service::TableService;
use crate::domain::dashboard::Transport;
use crate::infrastructure::config::Settings;
use crate::infrastructure::databricks_client::DatabricksClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub host: String,
    pub client: Arc<DatabricksClient>,
}

impl AppState {
    pub fn new(settings: Settings, host: impl Into<String>, client: Arc<DatabricksClient>) -> Self {
        Self {
            settings,
            host: host.into(),
            client,
        }
    }

    pub fn requirements(&self) -> Requirements {
        self.settings.requirements.clone().into()
    }

    pub fn context_resolver(&self) -> ContextResolver {
        ContextResolver::new(self.client.clone())
    }

    pub fn validator(&self) -> PrerequisiteValidator {
        PrerequisiteValidator::new(self.client.clone(), self.requirements())
    }

    pub fn dashboard_manager(&self, transport: Transport) -> DashboardManager {
        DashboardManager::new(self.client.clone(), self.host.clone(), transport)
    }

    pub fn admin_service(&self) -> AdminService {
        AdminService::new(self.client.clone(), self.client.clone(), self.requirements())
    }

    pub fn table_service(&self) -> TableService {
        TableService::new(self.client.clone(), self.client.clone())
    }
}
