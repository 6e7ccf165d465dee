// Command line surface
use crate::domain::dashboard::Transport;
use crate::infrastructure::config::DEFAULT_CONFIG_PATH;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "lakeview-bootstrap",
    about = "Validate a Databricks workspace and provision the system tables dashboard"
)]
pub struct Cli {
    /// Configuration file, without extension
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system schemas, caller permissions and warehouse sizing
    Validate,
    /// Validate, then create or update the dashboard from a template
    Provision(ProvisionArgs),
    /// Download a dashboard definition to a local file
    Export {
        /// Dashboard display name. Defaults to the configured name.
        #[arg(short, long)]
        name: Option<String>,

        /// Workspace folder holding the dashboard. Defaults to the caller's home folder.
        #[arg(long)]
        parent_path: Option<String>,

        /// Local file to write
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Upload a local dashboard definition, replacing any existing file
    Import {
        /// Local dashboard definition. Defaults to the configured template.
        #[arg(short, long)]
        template: Option<PathBuf>,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(long)]
        parent_path: Option<String>,
    },
    /// Enable the required system schemas on the current metastore
    EnableSchemas,
    /// Grant users access to the required system tables
    Grant {
        /// Comma-separated users or groups. Prompted for when omitted.
        #[arg(short, long)]
        users: Option<String>,
    },
    /// Flatten a JSON array of records and write it as a managed table
    PublishTable(PublishTableArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ProvisionArgs {
    /// Dashboard template. Defaults to the configured template.
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Dashboard display name. Defaults to the configured name.
    #[arg(short, long)]
    pub name: Option<String>,

    #[arg(long)]
    pub parent_path: Option<String>,

    /// Catalog substituted for CATALOG_NAME
    #[arg(long, requires_all = ["schema", "table"])]
    pub catalog: Option<String>,

    /// Schema substituted for SCHEMA_NAME
    #[arg(long, requires_all = ["catalog", "table"])]
    pub schema: Option<String>,

    /// Table substituted for TABLE_NAME
    #[arg(long, requires_all = ["catalog", "schema"])]
    pub table: Option<String>,

    #[arg(long, value_enum)]
    pub transport: Option<TransportArg>,

    /// Warehouse attached to the dashboard. Defaults to the first qualifying one.
    #[arg(long)]
    pub warehouse_id: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PublishTableArgs {
    /// JSON file holding an array of records
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(long)]
    pub catalog: String,

    #[arg(long)]
    pub schema: String,

    #[arg(long)]
    pub table: String,

    /// Object column to spread into one integer column per key
    #[arg(long = "map-column")]
    pub map_columns: Vec<String>,

    /// Spread struct columns into `{parent}_{child}` columns
    #[arg(long)]
    pub flatten_structs: bool,

    /// Column comments file. Defaults to the configured one.
    #[arg(long)]
    pub comments: Option<PathBuf>,

    /// Keep only these columns, in this order
    #[arg(long, value_delimiter = ',')]
    pub select: Option<Vec<String>>,

    /// Replace the table instead of appending
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportArg {
    Lakeview,
    WorkspaceImport,
}

impl From<TransportArg> for Transport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Lakeview => Transport::Lakeview,
            TransportArg::WorkspaceImport => Transport::WorkspaceImport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_arguments() {
        let cli = Cli::try_parse_from([
            "lakeview-bootstrap",
            "provision",
            "--catalog",
            "main",
            "--schema",
            "ops",
            "--table",
            "usage",
            "--transport",
            "workspace-import",
        ])
        .unwrap();

        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);
        match cli.command {
            Commands::Provision(args) => {
                assert_eq!(args.catalog.as_deref(), Some("main"));
                assert_eq!(args.transport.map(Transport::from), Some(Transport::WorkspaceImport));
                assert!(args.template.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_placeholders_come_together() {
        let parsed = Cli::try_parse_from(["lakeview-bootstrap", "provision", "--catalog", "main"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_publish_table_arguments() {
        let cli = Cli::try_parse_from([
            "lakeview-bootstrap",
            "--config",
            "conf/dev",
            "publish-table",
            "--input",
            "clusters.json",
            "--catalog",
            "main",
            "--schema",
            "ops",
            "--table",
            "clusters",
            "--map-column",
            "tags",
            "--map-column",
            "spark_conf",
            "--select",
            "cluster_id,team",
            "--overwrite",
        ])
        .unwrap();

        assert_eq!(cli.config, "conf/dev");
        let Commands::PublishTable(args) = cli.command else {
            panic!("expected publish-table");
        };
        assert_eq!(args.map_columns, vec!["tags", "spark_conf"]);
        assert_eq!(args.select, Some(vec!["cluster_id".to_string(), "team".to_string()]));
        assert!(args.overwrite);
        assert!(!args.flatten_structs);
    }
}
