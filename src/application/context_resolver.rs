// Context resolver - Who is calling and against which metastore
use crate::application::workspace_api::IdentityApi;
use crate::domain::error::BootstrapResult;
use crate::domain::workspace::WorkspaceContext;
use std::sync::Arc;

#[derive(Clone)]
pub struct ContextResolver {
    identity: Arc<dyn IdentityApi>,
}

impl ContextResolver {
    pub fn new(identity: Arc<dyn IdentityApi>) -> Self {
        Self { identity }
    }

    pub async fn resolve(&self, host: &str) -> BootstrapResult<WorkspaceContext> {
        let user = self.identity.current_user().await?;
        let metastore_id = self.identity.current_metastore_id().await?;

        tracing::debug!(
            "Resolved context: user={} groups={} metastore={}",
            user.user_name,
            user.groups.len(),
            metastore_id
        );

        Ok(WorkspaceContext {
            host: host.to_string(),
            user_id: user.id,
            user_name: user.user_name,
            groups: user.groups,
            metastore_id,
        })
    }
}
