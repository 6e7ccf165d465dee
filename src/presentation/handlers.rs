// Command handlers
use crate::application::admin_service::parse_user_list;
use crate::application::provisioning_service::{ProvisionOutcome, ProvisionRequest, ProvisioningService};
use crate::application::table_service::{TableTarget, TableWriteOptions, WriteMode};
use crate::domain::dashboard::{DashboardTemplate, Placeholders, Transport};
use crate::domain::frame::{flatten_map, flatten_struct, Frame};
use crate::presentation::app_state::AppState;
use crate::presentation::cli::{Commands, ProvisionArgs, PublishTableArgs};
use crate::presentation::prompt::LinePrompt;
use crate::presentation::report;
use anyhow::{bail, Context};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub async fn run_command(state: &AppState, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Validate => validate(state).await,
        Commands::Provision(args) => provision(state, args).await,
        Commands::Export {
            name,
            parent_path,
            output,
        } => export(state, name, parent_path, output).await,
        Commands::Import {
            template,
            name,
            parent_path,
        } => import(state, template, name, parent_path).await,
        Commands::EnableSchemas => enable_schemas(state).await,
        Commands::Grant { users } => grant(state, users).await,
        Commands::PublishTable(args) => publish_table(state, args).await,
    }
}

fn terminal_prompt() -> LinePrompt<BufReader<io::Stdin>, io::Stdout> {
    LinePrompt::new(BufReader::new(io::stdin()), io::stdout())
}

async fn validate(state: &AppState) -> anyhow::Result<()> {
    let context = state
        .context_resolver()
        .resolve(&state.host)
        .await
        .context("Failed to resolve the workspace context")?;
    let validation = state.validator().validate(&context).await;

    report::write_validation(&mut io::stdout().lock(), &validation)?;
    if !validation.all_passed() {
        bail!("{} prerequisite check(s) failed", validation.failures().count());
    }
    Ok(())
}

/// Explicit placeholders win over configured ones
fn placeholders(args: &ProvisionArgs, configured: Option<&Placeholders>) -> Option<Placeholders> {
    match (&args.catalog, &args.schema, &args.table) {
        (Some(catalog), Some(schema), Some(table)) => Some(Placeholders::new(catalog, schema, table)),
        _ => configured.cloned(),
    }
}

async fn provision(state: &AppState, args: ProvisionArgs) -> anyhow::Result<()> {
    let dashboard = &state.settings.dashboard;
    let transport: Transport = args.transport.map(Into::into).unwrap_or(dashboard.transport);
    let request = ProvisionRequest {
        template_path: args.template.clone().unwrap_or_else(|| dashboard.template.clone()),
        name: args.name.clone().unwrap_or_else(|| dashboard.name.clone()),
        parent_path: args.parent_path.clone().or_else(|| dashboard.parent_path.clone()),
        placeholders: placeholders(&args, dashboard.placeholders.as_ref()),
        warehouse_id: args
            .warehouse_id
            .clone()
            .or_else(|| state.settings.workspace.warehouse_id.clone()),
    };

    let service = ProvisioningService::new(
        state.host.clone(),
        state.context_resolver(),
        state.validator(),
        state.client.clone(),
        transport,
        Arc::new(terminal_prompt()),
    );
    let outcome = service.provision(&request).await?;

    report::write_provision_outcome(&mut io::stdout().lock(), &outcome)?;
    if let ProvisionOutcome::Halted(validation) = &outcome {
        bail!("{} prerequisite check(s) failed", validation.failures().count());
    }
    Ok(())
}

/// Configured parent folder, else the caller's home folder
async fn parent_folder(state: &AppState, parent_path: Option<String>) -> anyhow::Result<String> {
    if let Some(path) = parent_path.or_else(|| state.settings.dashboard.parent_path.clone()) {
        return Ok(path);
    }
    let context = state
        .context_resolver()
        .resolve(&state.host)
        .await
        .context("Failed to resolve the workspace context")?;
    Ok(context.home_folder())
}

async fn export(
    state: &AppState,
    name: Option<String>,
    parent_path: Option<String>,
    output: PathBuf,
) -> anyhow::Result<()> {
    let name = name.unwrap_or_else(|| state.settings.dashboard.name.clone());
    let parent_path = parent_folder(state, parent_path).await?;

    let mut manager = state.dashboard_manager(Transport::WorkspaceImport);
    let template = manager
        .export(&parent_path, &name)
        .await
        .with_context(|| format!("Failed to export dashboard '{}' from {}", name, parent_path))?;
    manager.set_template(template);
    manager.save_local(&output)?;

    println!("Saved '{}' to {}", name, output.display());
    Ok(())
}

async fn import(
    state: &AppState,
    template: Option<PathBuf>,
    name: Option<String>,
    parent_path: Option<String>,
) -> anyhow::Result<()> {
    let template_path = template.unwrap_or_else(|| state.settings.dashboard.template.clone());
    let name = name.unwrap_or_else(|| state.settings.dashboard.name.clone());
    let parent_path = parent_folder(state, parent_path).await?;

    let document = DashboardTemplate::load(&template_path)?;
    let handle = state
        .dashboard_manager(Transport::WorkspaceImport)
        .import(&parent_path, &name, &document)
        .await
        .with_context(|| format!("Failed to import dashboard '{}' into {}", name, parent_path))?;

    report::write_dashboard_ready(&mut io::stdout().lock(), &handle)?;
    Ok(())
}

async fn enable_schemas(state: &AppState) -> anyhow::Result<()> {
    let context = state
        .context_resolver()
        .resolve(&state.host)
        .await
        .context("Failed to resolve the workspace context")?;
    let enabled = state
        .admin_service()
        .enable_system_schemas(&context)
        .await
        .context("Failed to enable system schemas")?;

    if enabled.is_empty() {
        println!("Every required system schema is already enabled");
    } else {
        println!("Enabled system schemas: {}", enabled.join(", "));
    }
    Ok(())
}

async fn grant(state: &AppState, users: Option<String>) -> anyhow::Result<()> {
    let answer = match users {
        Some(users) => users,
        None => terminal_prompt().ask_users()?,
    };
    let users = parse_user_list(&answer);
    if users.is_empty() {
        bail!("No users given");
    }

    let issued = state
        .admin_service()
        .grant_system_access(&users)
        .await
        .context("Failed to grant system table access")?;
    println!("Issued {} grants for {} users", issued, users.len());
    Ok(())
}

fn comments_file(explicit: Option<PathBuf>, configured: &Path) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path),
        None if configured.exists() => Some(configured.to_path_buf()),
        None => {
            tracing::debug!("No column comments file at {}", configured.display());
            None
        }
    }
}

async fn publish_table(state: &AppState, args: PublishTableArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let document: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;

    let mut frame = Frame::from_json_rows(&document, &args.map_columns)?;
    if !args.map_columns.is_empty() {
        frame = flatten_map(frame, &args.map_columns);
    }
    if args.flatten_structs {
        frame = flatten_struct(frame);
    }

    let target = TableTarget {
        catalog: args.catalog,
        schema: args.schema,
        table: args.table,
    };
    let options = TableWriteOptions {
        mode: if args.overwrite {
            WriteMode::Overwrite
        } else {
            WriteMode::Append
        },
        select_columns: args.select,
        comments_file: comments_file(args.comments, &state.settings.table.comments_file),
    };

    let summary = state
        .table_service()
        .create_table_from_frame(&frame, &target, &options)
        .await?;
    report::write_table_summary(&mut io::stdout().lock(), &target, &summary)?;
    Ok(())
}
