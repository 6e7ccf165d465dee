// Provisioning service - Validate the workspace, then create or update the dashboard
use crate::application::context_resolver::ContextResolver;
use crate::application::dashboard_manager::DashboardManager;
use crate::application::prerequisite_validator::PrerequisiteValidator;
use crate::application::workspace_api::DashboardApi;
use crate::domain::dashboard::{ConflictDecision, CreateOutcome, DashboardHandle, Placeholders, Transport};
use crate::domain::validation::ValidationReport;
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

/// Decides what happens when a dashboard of the same name already exists
pub trait ConflictResolver: Send + Sync {
    fn resolve_conflict(
        &self,
        name: &str,
        parent_path: &str,
        existing_id: Option<&str>,
    ) -> anyhow::Result<ConflictDecision>;
}

#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub template_path: PathBuf,
    pub name: String,
    /// Defaults to the caller's home folder
    pub parent_path: Option<String>,
    pub placeholders: Option<Placeholders>,
    /// Defaults to the first warehouse that passed the sizing check
    pub warehouse_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ProvisionOutcome {
    /// At least one prerequisite failed; nothing was written
    Halted(ValidationReport),
    Created(DashboardHandle),
    Updated(DashboardHandle),
    Skipped { name: String },
}

#[derive(Clone)]
pub struct ProvisioningService {
    host: String,
    context_resolver: ContextResolver,
    validator: PrerequisiteValidator,
    dashboards: Arc<dyn DashboardApi>,
    transport: Transport,
    conflicts: Arc<dyn ConflictResolver>,
}

impl ProvisioningService {
    pub fn new(
        host: impl Into<String>,
        context_resolver: ContextResolver,
        validator: PrerequisiteValidator,
        dashboards: Arc<dyn DashboardApi>,
        transport: Transport,
        conflicts: Arc<dyn ConflictResolver>,
    ) -> Self {
        Self {
            host: host.into(),
            context_resolver,
            validator,
            dashboards,
            transport,
            conflicts,
        }
    }

    pub async fn provision(&self, request: &ProvisionRequest) -> anyhow::Result<ProvisionOutcome> {
        let context = self
            .context_resolver
            .resolve(&self.host)
            .await
            .context("Failed to resolve the workspace context")?;

        let report = self.validator.validate(&context).await;
        if !report.all_passed() {
            return Ok(ProvisionOutcome::Halted(report));
        }

        let mut manager = DashboardManager::new(self.dashboards.clone(), self.host.clone(), self.transport);
        manager.load_template(&request.template_path)?;
        if let Some(placeholders) = &request.placeholders {
            manager.substitute_placeholders(placeholders)?;
        }
        manager
            .ensure_resolved()
            .context("Dashboard template is not ready to transmit")?;

        let parent_path = request
            .parent_path
            .clone()
            .unwrap_or_else(|| context.home_folder());
        let warehouse_id = request
            .warehouse_id
            .clone()
            .or_else(|| report.qualifying_warehouses.first().map(|w| w.id.clone()));

        tracing::info!(
            "Creating dashboard '{}' under {} (warehouse: {})",
            request.name,
            parent_path,
            warehouse_id.as_deref().unwrap_or("none")
        );

        let outcome = manager
            .create(&parent_path, &request.name, warehouse_id.as_deref())
            .await
            .with_context(|| format!("Failed to create dashboard '{}'", request.name))?;

        match outcome {
            CreateOutcome::Created(handle) => Ok(ProvisionOutcome::Created(handle)),
            CreateOutcome::NameConflict { existing_id } => {
                // the resolver may block on the terminal
                let resolver = Arc::clone(&self.conflicts);
                let (name, folder) = (request.name.clone(), parent_path.clone());
                let decision = tokio::task::spawn_blocking(move || {
                    resolver.resolve_conflict(&name, &folder, existing_id.as_deref())
                })
                .await
                .context("Conflict resolution did not complete")??;
                match decision {
                    ConflictDecision::Skip => {
                        tracing::info!("Left existing dashboard '{}' untouched", request.name);
                        Ok(ProvisionOutcome::Skipped {
                            name: request.name.clone(),
                        })
                    }
                    ConflictDecision::UpdateWithId(id) => {
                        let handle = manager
                            .update(&id, warehouse_id.as_deref())
                            .await
                            .with_context(|| format!("Failed to update dashboard {}", id))?;
                        Ok(ProvisionOutcome::Updated(handle))
                    }
                }
            }
        }
    }
}
