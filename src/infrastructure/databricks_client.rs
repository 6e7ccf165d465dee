// Databricks workspace REST binding for the application ports
use crate::application::workspace_api::{
    CurrentUser, DashboardApi, IdentityApi, MetadataApi, NewDashboard, StatementApi,
};
use crate::domain::error::{BootstrapError, BootstrapResult};
use crate::domain::sql::quote_literal;
use crate::domain::workspace::{SystemSchema, WarehouseDescriptor};
use crate::infrastructure::config::{Credentials, WorkspaceSettings};
use crate::infrastructure::wire::*;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;

const DASHBOARD_PAGE_SIZE: u32 = 100;

type Rows = Vec<Vec<Option<String>>>;

pub struct DatabricksClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
    configured_warehouse: Option<String>,
    statement_warehouse: OnceCell<String>,
    poll_interval: Duration,
    max_polls: u32,
}

impl DatabricksClient {
    pub fn new(credentials: &Credentials, settings: &WorkspaceSettings) -> Self {
        Self {
            base_url: format!("https://{}", credentials.host),
            token: credentials.token.clone(),
            http: reqwest::Client::new(),
            configured_warehouse: settings.warehouse_id.clone(),
            statement_warehouse: OnceCell::new(),
            poll_interval: Duration::from_millis(settings.statement_poll_interval_ms),
            max_polls: settings.statement_max_polls,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorized(self.http.get(self.url(path)))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> BootstrapResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| BootstrapError::transport(format!("Failed to send request to workspace: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status.as_u16(), &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BootstrapError::transport(format!("Failed to parse workspace response: {}", e)))
    }

    async fn statement_warehouse(&self) -> BootstrapResult<&str> {
        let id = self
            .statement_warehouse
            .get_or_try_init(|| self.pick_statement_warehouse())
            .await?;
        Ok(id.as_str())
    }

    /// The configured warehouse, else the first dashboard-capable one, else any
    async fn pick_statement_warehouse(&self) -> BootstrapResult<String> {
        if let Some(id) = &self.configured_warehouse {
            return Ok(id.clone());
        }
        let warehouses = self.list_warehouses().await?;
        let chosen = warehouses
            .iter()
            .find(|w| w.size_class.is_dashboard_capable())
            .or_else(|| warehouses.first())
            .ok_or_else(|| BootstrapError::MissingResource("no SQL warehouse available to run statements".into()))?;
        tracing::debug!("Running statements on warehouse {} ({})", chosen.name, chosen.id);
        Ok(chosen.id.clone())
    }

    async fn list_dashboards_page(&self, page_token: Option<&str>) -> BootstrapResult<DashboardList> {
        let mut path = format!("/api/2.0/lakeview/dashboards?page_size={}", DASHBOARD_PAGE_SIZE);
        if let Some(token) = page_token {
            path.push_str(&format!("&page_token={}", urlencoding::encode(token)));
        }
        self.send(self.get(&path)).await
    }
}

/// Typed error out of a non-success response body
pub fn error_from_body(status: u16, body: &str) -> BootstrapError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => {
            let message = parsed.message.unwrap_or_else(|| body.to_string());
            BootstrapError::from_response(status, parsed.error_code.as_deref(), message)
        }
        Err(_) => BootstrapError::from_response(status, None, body.to_string()),
    }
}

/// Re-fetch a statement until it leaves PENDING/RUNNING, at most `max_polls` times
async fn poll_until_done<F, Fut>(
    mut response: StatementResponse,
    max_polls: u32,
    interval: Duration,
    mut fetch: F,
) -> BootstrapResult<StatementResponse>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = BootstrapResult<StatementResponse>>,
{
    let mut polls = 0;
    while response.status.is_pending() {
        if polls >= max_polls {
            return Err(BootstrapError::transport(format!(
                "Statement {} still {} after {} polls",
                response.statement_id, response.status.state, polls
            )));
        }
        tokio::time::sleep(interval).await;
        response = fetch(response.statement_id.clone()).await?;
        polls += 1;
    }
    Ok(response)
}

/// Rows of a finished statement, following `next_chunk_index` through every chunk
async fn collect_rows<F, Fut>(response: StatementResponse, mut fetch_chunk: F) -> BootstrapResult<Rows>
where
    F: FnMut(String, u64) -> Fut,
    Fut: Future<Output = BootstrapResult<StatementResult>>,
{
    let statement_id = response.statement_id.clone();
    let Some(first) = statement_result(response)? else {
        return Ok(Vec::new());
    };

    let mut rows = first.data_array;
    let mut next = first.next_chunk_index;
    while let Some(index) = next {
        let chunk = fetch_chunk(statement_id.clone(), index).await?;
        rows.extend(chunk.data_array);
        // chunk indexes only move forward
        next = chunk.next_chunk_index.filter(|n| *n > index);
    }
    Ok(rows)
}

fn statement_result(response: StatementResponse) -> BootstrapResult<Option<StatementResult>> {
    match response.status.state.as_str() {
        "SUCCEEDED" => Ok(response.result),
        state => {
            let (code, message) = match response.status.error {
                Some(error) => (
                    error.error_code.unwrap_or_default(),
                    error.message.unwrap_or_else(|| format!("statement {}", state)),
                ),
                None => (String::new(), format!("statement {}", state)),
            };
            Err(BootstrapError::from_error_code(&code, message).unwrap_or_else(|message| {
                BootstrapError::transport(format!("Statement {} {}: {}", response.statement_id, state, message))
            }))
        }
    }
}

pub fn table_privileges_query(catalog: &str, grantees: &[String]) -> String {
    let grantees = grantees
        .iter()
        .map(|g| quote_literal(g))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT table_catalog, table_schema, table_name \
         FROM system.information_schema.table_privileges \
         WHERE table_catalog = {} AND grantee IN ({}) \
         AND privilege_type IN ('SELECT', 'ALL PRIVILEGES')",
        quote_literal(catalog),
        grantees
    )
}

#[async_trait]
impl IdentityApi for DatabricksClient {
    async fn current_user(&self) -> BootstrapResult<CurrentUser> {
        tracing::debug!("Fetching current user");
        let user: ScimUser = self.send(self.get("/api/2.0/preview/scim/v2/Me")).await?;
        Ok(CurrentUser {
            id: user.id,
            user_name: user.user_name,
            groups: user.groups.into_iter().filter_map(|g| g.display).collect(),
        })
    }

    async fn current_metastore_id(&self) -> BootstrapResult<String> {
        tracing::debug!("Fetching current metastore assignment");
        let assignment: MetastoreAssignment = self
            .send(self.get("/api/2.1/unity-catalog/current-metastore-assignment"))
            .await?;
        Ok(assignment.metastore_id)
    }
}

#[async_trait]
impl MetadataApi for DatabricksClient {
    async fn list_system_schemas(&self, metastore_id: &str) -> BootstrapResult<Vec<SystemSchema>> {
        let base = format!(
            "/api/2.1/unity-catalog/metastores/{}/systemschemas",
            urlencoding::encode(metastore_id)
        );
        let mut schemas = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let path = match &page_token {
                Some(token) => format!("{}?page_token={}", base, urlencoding::encode(token)),
                None => base.clone(),
            };
            tracing::debug!("Listing system schemas: {}", path);
            let page: SystemSchemaList = self.send(self.get(&path)).await?;
            schemas.extend(page.schemas.into_iter().map(|s| SystemSchema {
                name: s.schema,
                state: s.state.unwrap_or_default(),
            }));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(schemas)
    }

    async fn enable_system_schema(&self, metastore_id: &str, schema: &str) -> BootstrapResult<()> {
        let path = format!(
            "/api/2.1/unity-catalog/metastores/{}/systemschemas/{}",
            urlencoding::encode(metastore_id),
            urlencoding::encode(schema)
        );
        let _: serde_json::Value = self
            .send(self.authorized(self.http.put(self.url(&path))))
            .await?;
        Ok(())
    }

    async fn list_warehouses(&self) -> BootstrapResult<Vec<WarehouseDescriptor>> {
        tracing::debug!("Listing SQL warehouses");
        let list: WarehouseList = self.send(self.get("/api/2.0/sql/warehouses")).await?;
        Ok(list
            .warehouses
            .into_iter()
            .map(|w| WarehouseDescriptor::new(w.id, w.name, w.cluster_size.as_deref().unwrap_or_default()))
            .collect())
    }

    async fn granted_tables(&self, catalog: &str, grantees: &[String]) -> BootstrapResult<Vec<String>> {
        let rows = self.execute(&table_privileges_query(catalog, grantees)).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match row.as_slice() {
                [Some(catalog), Some(schema), Some(table), ..] => {
                    Some(format!("{}.{}.{}", catalog, schema, table))
                }
                _ => None,
            })
            .collect())
    }

    async fn table_exists(&self, full_name: &str) -> BootstrapResult<bool> {
        let path = format!(
            "/api/2.1/unity-catalog/tables/{}/exists",
            urlencoding::encode(full_name)
        );
        let exists: TableExists = self.send(self.get(&path)).await?;
        Ok(exists.table_exists)
    }
}

#[async_trait]
impl StatementApi for DatabricksClient {
    async fn execute(&self, statement: &str) -> BootstrapResult<Vec<Vec<Option<String>>>> {
        let warehouse_id = self.statement_warehouse().await?;
        tracing::debug!("Executing statement on warehouse {}: {}", warehouse_id, statement);

        let request = self
            .authorized(self.http.post(self.url("/api/2.0/sql/statements")))
            .json(&StatementRequest::inline(statement, warehouse_id));
        let response: StatementResponse = self.send(request).await?;

        let response = poll_until_done(response, self.max_polls, self.poll_interval, move |id| {
            self.send::<StatementResponse>(self.get(&format!("/api/2.0/sql/statements/{}", id)))
        })
        .await?;

        collect_rows(response, move |id, index| {
            tracing::debug!("Fetching result chunk {} of statement {}", index, id);
            self.send::<StatementResult>(
                self.get(&format!("/api/2.0/sql/statements/{}/result/chunks/{}", id, index)),
            )
        })
        .await
    }
}

#[async_trait]
impl DashboardApi for DatabricksClient {
    async fn create_dashboard(&self, request: &NewDashboard) -> BootstrapResult<String> {
        tracing::debug!(
            "Creating dashboard '{}' under {}",
            request.display_name,
            request.parent_path
        );
        let body = CreateDashboardBody {
            display_name: &request.display_name,
            parent_path: &request.parent_path,
            serialized_dashboard: &request.serialized_dashboard,
            warehouse_id: request.warehouse_id.as_deref(),
        };
        let created: DashboardBody = self
            .send(
                self.authorized(self.http.post(self.url("/api/2.0/lakeview/dashboards")))
                    .json(&body),
            )
            .await?;
        Ok(created.dashboard_id)
    }

    async fn update_dashboard(
        &self,
        dashboard_id: &str,
        serialized_dashboard: &str,
        warehouse_id: Option<&str>,
    ) -> BootstrapResult<String> {
        tracing::debug!("Updating dashboard {}", dashboard_id);
        let path = format!("/api/2.0/lakeview/dashboards/{}", urlencoding::encode(dashboard_id));
        let body = UpdateDashboardBody {
            serialized_dashboard,
            warehouse_id,
        };
        let updated: DashboardBody = self
            .send(self.authorized(self.http.patch(self.url(&path))).json(&body))
            .await?;
        Ok(updated.dashboard_id)
    }

    async fn find_dashboard(&self, parent_path: &str, display_name: &str) -> BootstrapResult<Option<String>> {
        let mut page_token: Option<String> = None;
        loop {
            let page = self.list_dashboards_page(page_token.as_deref()).await?;
            if let Some(found) = page
                .dashboards
                .iter()
                .find(|d| d.matches(parent_path, display_name))
            {
                return Ok(Some(found.dashboard_id.clone()));
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(None),
            }
        }
    }

    async fn export_file(&self, path: &str) -> BootstrapResult<String> {
        tracing::debug!("Exporting workspace file {}", path);
        let request_path = format!(
            "/api/2.0/workspace/export?path={}&format=AUTO",
            urlencoding::encode(path)
        );
        let exported: ExportResponse = self.send(self.get(&request_path)).await?;
        let bytes = BASE64
            .decode(exported.content.as_bytes())
            .map_err(|e| BootstrapError::parse(path, e))?;
        String::from_utf8(bytes).map_err(|e| BootstrapError::parse(path, e))
    }

    async fn import_file(&self, path: &str, content: &str, overwrite: bool) -> BootstrapResult<()> {
        tracing::debug!("Importing workspace file {} (overwrite: {})", path, overwrite);
        let body = ImportBody {
            path,
            content: BASE64.encode(content.as_bytes()),
            format: "AUTO",
            overwrite,
        };
        let _: serde_json::Value = self
            .send(
                self.authorized(self.http.post(self.url("/api/2.0/workspace/import")))
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    async fn resource_id(&self, path: &str) -> BootstrapResult<String> {
        let request_path = format!("/api/2.0/workspace/get-status?path={}", urlencoding::encode(path));
        let status: ObjectStatus = self.send(self.get(&request_path)).await?;
        status
            .resource_id
            .or_else(|| status.object_id.map(|id| id.to_string()))
            .ok_or_else(|| BootstrapError::MissingResource(format!("{} has no resource id", path)))
    }
}
