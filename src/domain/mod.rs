// Domain layer - Workspace, validation, dashboard and table models
pub mod dashboard;
pub mod error;
pub mod frame;
pub mod sql;
pub mod validation;
pub mod workspace;
