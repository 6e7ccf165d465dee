// Prerequisite validator - System schemas, table grants and warehouse sizing
use crate::application::workspace_api::MetadataApi;
use crate::domain::validation::{format_name_set, Requirement, ValidationReport, ValidationResult};
use crate::domain::workspace::{WarehouseDescriptor, WorkspaceContext, REQUIRED_SYSTEM_SCHEMAS, REQUIRED_SYSTEM_TABLES};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

const SYSTEM_CATALOG: &str = "system";

/// What the dashboard needs from the workspace
#[derive(Debug, Clone, PartialEq)]
pub struct Requirements {
    pub system_schemas: Vec<String>,
    pub system_tables: Vec<String>,
}

impl Default for Requirements {
    fn default() -> Self {
        Self {
            system_schemas: REQUIRED_SYSTEM_SCHEMAS.iter().map(|s| s.to_string()).collect(),
            system_tables: REQUIRED_SYSTEM_TABLES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Clone)]
pub struct PrerequisiteValidator {
    metadata: Arc<dyn MetadataApi>,
    requirements: Requirements,
}

impl PrerequisiteValidator {
    pub fn new(metadata: Arc<dyn MetadataApi>, requirements: Requirements) -> Self {
        Self {
            metadata,
            requirements,
        }
    }

    /// Run every check. A failing or erroring check never stops the others.
    pub async fn validate(&self, context: &WorkspaceContext) -> ValidationReport {
        let schemas = self.validate_system_schemas(context).await;
        let permission = self.validate_permission(context).await;
        let (warehouse, qualifying_warehouses) = self.validate_warehouse().await;

        let report = ValidationReport {
            results: vec![schemas, permission, warehouse],
            qualifying_warehouses,
        };

        for result in &report.results {
            match &result.error {
                None => tracing::info!("Prerequisite '{}' passed", result.requirement),
                Some(error) => tracing::warn!("Prerequisite '{}' failed: {}", result.requirement, error),
            }
        }

        report
    }

    pub async fn validate_system_schemas(&self, context: &WorkspaceContext) -> ValidationResult {
        match self.metadata.list_system_schemas(&context.metastore_id).await {
            Ok(schemas) => {
                let enabled: HashSet<String> = schemas
                    .into_iter()
                    .filter(|s| s.is_enabled())
                    .map(|s| s.name)
                    .collect();
                check_schemas(&self.requirements.system_schemas, &enabled)
            }
            Err(e) => ValidationResult::fail(
                Requirement::SystemTables,
                format!(
                    "{}. You do not have permission to enable or access the system schemas. \
                     Verify that the required schemas {} exist in the workspace; if not, \
                     ask an account admin to run `enable-schemas`",
                    e,
                    format_name_set(&self.requirements.system_schemas)
                ),
            ),
        }
    }

    pub async fn validate_permission(&self, context: &WorkspaceContext) -> ValidationResult {
        let grantees = context.grantees();
        match self.metadata.granted_tables(SYSTEM_CATALOG, &grantees).await {
            Ok(granted) => {
                let granted: HashSet<String> = granted.into_iter().collect();
                check_permissions(&self.requirements.system_tables, &granted)
            }
            Err(e) => ValidationResult::fail(
                Requirement::Permission,
                format!(
                    "{}. You do not have permission to query system.information_schema.table_privileges \
                     to check other permissions. Contact a metastore admin for permission",
                    e
                ),
            ),
        }
    }

    pub async fn validate_warehouse(&self) -> (ValidationResult, Vec<WarehouseDescriptor>) {
        match self.metadata.list_warehouses().await {
            Ok(warehouses) => check_warehouses(&warehouses),
            Err(e) => (
                ValidationResult::fail(
                    Requirement::Warehouse,
                    format!("{}. Unable to list the SQL warehouses of this workspace", e),
                ),
                Vec::new(),
            ),
        }
    }
}

fn missing<'a>(required: &'a [String], present: &HashSet<String>) -> BTreeSet<&'a String> {
    required.iter().filter(|r| !present.contains(*r)).collect()
}

pub fn check_schemas(required: &[String], enabled: &HashSet<String>) -> ValidationResult {
    let missing = missing(required, enabled);
    if missing.is_empty() {
        return ValidationResult::pass(Requirement::SystemTables);
    }

    ValidationResult::fail(
        Requirement::SystemTables,
        format!(
            "The necessary schemas {} are not enabled. Ask an account admin to run `enable-schemas`",
            format_name_set(missing)
        ),
    )
}

pub fn check_permissions(required: &[String], granted: &HashSet<String>) -> ValidationResult {
    let missing = missing(required, granted);
    if missing.is_empty() {
        return ValidationResult::pass(Requirement::Permission);
    }

    ValidationResult::fail(
        Requirement::Permission,
        format!(
            "You do not have permission to access the necessary system tables {}. \
             Ask a metastore admin to run `grant` for you",
            format_name_set(missing)
        ),
    )
}

/// Passes when at least one warehouse is Medium or larger
pub fn check_warehouses(warehouses: &[WarehouseDescriptor]) -> (ValidationResult, Vec<WarehouseDescriptor>) {
    let qualifying: Vec<WarehouseDescriptor> = warehouses
        .iter()
        .filter(|w| w.size_class.is_dashboard_capable())
        .cloned()
        .collect();

    let result = if qualifying.is_empty() {
        ValidationResult::fail(
            Requirement::Warehouse,
            "Please have at least a Medium or Larger warehouse available",
        )
    } else {
        ValidationResult::pass(Requirement::Warehouse)
    };

    (result, qualifying)
}
