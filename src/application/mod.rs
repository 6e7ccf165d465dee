// Application layer - Use cases over the workspace ports
pub mod admin_service;
pub mod context_resolver;
pub mod dashboard_manager;
pub mod prerequisite_validator;
pub mod provisioning_service;
pub mod table_service;
pub mod workspace_api;

#[cfg(test)]
pub mod fake_workspace;
