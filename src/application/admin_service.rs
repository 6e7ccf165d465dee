// Admin service - Enable system schemas and grant access to them
use crate::application::prerequisite_validator::Requirements;
use crate::application::workspace_api::{MetadataApi, StatementApi};
use crate::domain::error::BootstrapResult;
use crate::domain::sql::quote_identifier;
use crate::domain::workspace::WorkspaceContext;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct AdminService {
    metadata: Arc<dyn MetadataApi>,
    statements: Arc<dyn StatementApi>,
    requirements: Requirements,
}

impl AdminService {
    pub fn new(metadata: Arc<dyn MetadataApi>, statements: Arc<dyn StatementApi>, requirements: Requirements) -> Self {
        Self {
            metadata,
            statements,
            requirements,
        }
    }

    /// Enable the required schemas that are not enabled yet. Needs an account admin.
    pub async fn enable_system_schemas(&self, context: &WorkspaceContext) -> BootstrapResult<Vec<String>> {
        let enabled: HashSet<String> = self
            .metadata
            .list_system_schemas(&context.metastore_id)
            .await?
            .into_iter()
            .filter(|s| s.is_enabled())
            .map(|s| s.name)
            .collect();

        let mut newly_enabled = Vec::new();
        for schema in &self.requirements.system_schemas {
            if enabled.contains(schema) {
                tracing::debug!("System schema {} is already enabled", schema);
                continue;
            }
            tracing::info!("Enabling system schema {} on metastore {}", schema, context.metastore_id);
            self.metadata
                .enable_system_schema(&context.metastore_id, schema)
                .await?;
            newly_enabled.push(schema.clone());
        }

        Ok(newly_enabled)
    }

    /// Grant each user what the dashboard queries need. Needs a metastore admin.
    pub async fn grant_system_access(&self, users: &[String]) -> BootstrapResult<usize> {
        let statements = grant_statements(&self.requirements, users);
        for statement in &statements {
            tracing::info!("{}", statement);
            self.statements.execute(statement).await?;
        }
        Ok(statements.len())
    }
}

/// Split a comma-separated list of principals, dropping blanks
pub fn parse_user_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn grant_statements(requirements: &Requirements, users: &[String]) -> Vec<String> {
    let mut statements = Vec::new();
    for user in users {
        let principal = quote_identifier(user);
        statements.push(format!("GRANT USE CATALOG ON CATALOG system TO {}", principal));
        for schema in &requirements.system_schemas {
            statements.push(format!("GRANT USE SCHEMA ON SCHEMA system.{} TO {}", schema, principal));
        }
        for table in &requirements.system_tables {
            statements.push(format!("GRANT SELECT ON TABLE {} TO {}", table, principal));
        }
    }
    statements
}
