// Table service - Persist a flattened frame as a managed table with column comments
use crate::application::workspace_api::{MetadataApi, StatementApi};
use crate::domain::error::{BootstrapError, BootstrapResult};
use crate::domain::frame::{DataType, Field, Frame};
use crate::domain::sql::{quote_identifier, quote_literal};
use anyhow::Context;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const INSERT_BATCH_ROWS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Append,
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTarget {
    pub catalog: String,
    pub schema: String,
    pub table: String,
}

impl TableTarget {
    pub fn full_name(&self) -> String {
        format!("{}.{}.{}", self.catalog, self.schema, self.table)
    }

    pub fn quoted_name(&self) -> String {
        format!(
            "{}.{}.{}",
            quote_identifier(&self.catalog),
            quote_identifier(&self.schema),
            quote_identifier(&self.table)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableWriteOptions {
    pub mode: WriteMode,
    pub select_columns: Option<Vec<String>>,
    pub comments_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWriteSummary {
    pub rows_written: usize,
    pub created: bool,
    pub comments_applied: usize,
}

#[derive(Clone)]
pub struct TableService {
    metadata: Arc<dyn MetadataApi>,
    statements: Arc<dyn StatementApi>,
}

impl TableService {
    pub fn new(metadata: Arc<dyn MetadataApi>, statements: Arc<dyn StatementApi>) -> Self {
        Self { metadata, statements }
    }

    pub async fn create_table_from_frame(
        &self,
        frame: &Frame,
        target: &TableTarget,
        options: &TableWriteOptions,
    ) -> anyhow::Result<TableWriteSummary> {
        let selected;
        let frame = match &options.select_columns {
            Some(columns) => {
                selected = frame.select(columns)?;
                &selected
            }
            None => frame,
        };
        frame.ensure_flat()?;

        let full_name = target.full_name();
        let existed = self
            .metadata
            .table_exists(&full_name)
            .await
            .with_context(|| format!("Failed to check whether {} exists", full_name))?;

        // comments are read before anything is written
        let comments = match (&options.comments_file, existed) {
            (Some(path), false) => Some(load_column_comments(path)?),
            _ => None,
        };

        tracing::info!("Write the frame into {}", full_name);
        self.statements
            .execute(&create_table_statement(target, frame.fields(), options.mode))
            .await?;

        for statement in insert_statements(target, frame) {
            self.statements.execute(&statement).await?;
        }

        let mut comments_applied = 0;
        if let Some(comments) = comments {
            tracing::info!("Add comments to table columns");
            for field in frame.fields() {
                let Some(comment) = comments.get(&field.name) else {
                    tracing::debug!("No comment for column {}", field.name);
                    continue;
                };
                let statement = comment_statement(target, &field.name, comment);
                tracing::info!("{}", statement);
                self.statements.execute(&statement).await?;
                comments_applied += 1;
            }
        }

        Ok(TableWriteSummary {
            rows_written: frame.rows().len(),
            created: !existed,
            comments_applied,
        })
    }
}

/// Column name to comment, from a flat JSON object
pub fn load_column_comments(path: &Path) -> BootstrapResult<HashMap<String, String>> {
    let origin = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| BootstrapError::parse(&origin, e))?;
    let document: serde_json::Map<String, Value> =
        serde_json::from_str(&text).map_err(|e| BootstrapError::parse(&origin, e))?;

    Ok(document
        .into_iter()
        .filter_map(|(column, comment)| match comment {
            Value::String(text) => Some((column, text)),
            Value::Null => None,
            other => Some((column, other.to_string())),
        })
        .collect())
}

fn sql_type(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::String => "STRING",
        DataType::Integer => "BIGINT",
        DataType::Double => "DOUBLE",
        DataType::Boolean => "BOOLEAN",
        // nested columns are rejected before any DDL is built
        DataType::Map | DataType::Struct(_) => "STRING",
    }
}

fn sql_literal(value: &Value, data_type: &DataType) -> String {
    match (value, data_type) {
        (Value::Null, _) => "NULL".to_string(),
        (Value::String(s), DataType::String) => quote_literal(s),
        (other, DataType::String) => quote_literal(&other.to_string()),
        (v, DataType::Integer) => v.as_i64().map(|i| i.to_string()).unwrap_or_else(|| "NULL".to_string()),
        (v, DataType::Double) => v
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f.to_string())
            .unwrap_or_else(|| "NULL".to_string()),
        (v, DataType::Boolean) => match v.as_bool() {
            Some(true) => "TRUE".to_string(),
            Some(false) => "FALSE".to_string(),
            None => "NULL".to_string(),
        },
        (other, _) => quote_literal(&other.to_string()),
    }
}

pub fn create_table_statement(target: &TableTarget, fields: &[Field], mode: WriteMode) -> String {
    let columns = fields
        .iter()
        .map(|f| format!("{} {}", quote_identifier(&f.name), sql_type(&f.data_type)))
        .collect::<Vec<_>>()
        .join(", ");
    let verb = match mode {
        WriteMode::Overwrite => "CREATE OR REPLACE TABLE",
        WriteMode::Append => "CREATE TABLE IF NOT EXISTS",
    };
    format!("{} {} ({}) USING DELTA", verb, target.quoted_name(), columns)
}

pub fn insert_statements(target: &TableTarget, frame: &Frame) -> Vec<String> {
    let columns = frame
        .fields()
        .iter()
        .map(|f| quote_identifier(&f.name))
        .collect::<Vec<_>>()
        .join(", ");

    frame
        .rows()
        .chunks(INSERT_BATCH_ROWS)
        .map(|chunk| {
            let values = chunk
                .iter()
                .map(|row| {
                    let literals = row
                        .iter()
                        .zip(frame.fields())
                        .map(|(value, field)| sql_literal(value, &field.data_type))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("({})", literals)
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("INSERT INTO {} ({}) VALUES {}", target.quoted_name(), columns, values)
        })
        .collect()
}

pub fn comment_statement(target: &TableTarget, column: &str, comment: &str) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} COMMENT {}",
        target.quoted_name(),
        quote_identifier(column),
        quote_literal(comment)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fake_workspace::FakeWorkspace;
    use crate::domain::frame::{flatten_map, FrameError};
    use serde_json::json;
    use std::io::Write;

    fn target() -> TableTarget {
        TableTarget {
            catalog: "main".to_string(),
            schema: "ops".to_string(),
            table: "cluster_usage".to_string(),
        }
    }

    fn frame() -> Frame {
        let rows = json!([
            {"cluster_id": "c'1", "dbus": 1.5, "interactive": true, "tags": {"team": 3}},
            {"cluster_id": "c2", "dbus": null, "interactive": false, "tags": {}}
        ]);
        let frame = Frame::from_json_rows(&rows, &["tags".to_string()]).unwrap();
        flatten_map(frame, &["tags".to_string()])
    }

    fn comments_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"cluster_id": "Cluster identifier", "dbus": "DBUs consumed", "unused": null}"#)
            .unwrap();
        file
    }

    #[test]
    fn test_statements_quote_identifiers_and_literals() {
        let frame = frame();
        assert_eq!(
            create_table_statement(&target(), frame.fields(), WriteMode::Append),
            "CREATE TABLE IF NOT EXISTS `main`.`ops`.`cluster_usage` \
             (`cluster_id` STRING, `dbus` DOUBLE, `interactive` BOOLEAN, `team` BIGINT) USING DELTA"
        );
        assert_eq!(
            insert_statements(&target(), &frame),
            vec![
                "INSERT INTO `main`.`ops`.`cluster_usage` (`cluster_id`, `dbus`, `interactive`, `team`) \
                 VALUES ('c\\'1', 1.5, TRUE, 3), ('c2', NULL, FALSE, NULL)"
                    .to_string()
            ]
        );
        assert_eq!(
            comment_statement(&target(), "dbus", "it's DBUs"),
            "ALTER TABLE `main`.`ops`.`cluster_usage` ALTER COLUMN `dbus` COMMENT 'it\\'s DBUs'"
        );
    }

    #[test]
    fn test_inserts_are_batched() {
        let rows: Vec<Value> = (0..1001).map(|i| json!({"n": i})).collect();
        let frame = Frame::from_json_rows(&Value::Array(rows), &[]).unwrap();
        assert_eq!(insert_statements(&target(), &frame).len(), 3);
    }

    #[tokio::test]
    async fn test_new_table_gets_comments() {
        let workspace = Arc::new(FakeWorkspace::default());
        let service = TableService::new(workspace.clone(), workspace.clone());
        let file = comments_file();
        let options = TableWriteOptions {
            mode: WriteMode::Overwrite,
            select_columns: None,
            comments_file: Some(file.path().to_path_buf()),
        };

        let summary = service
            .create_table_from_frame(&frame(), &target(), &options)
            .await
            .unwrap();
        assert_eq!(
            summary,
            TableWriteSummary {
                rows_written: 2,
                created: true,
                comments_applied: 2,
            }
        );

        let executed = workspace.executed();
        assert_eq!(executed.len(), 4);
        assert!(executed[0].starts_with("CREATE OR REPLACE TABLE"));
        assert!(executed[1].starts_with("INSERT INTO"));
        assert!(executed[2].contains("COMMENT 'Cluster identifier'"));
    }

    #[tokio::test]
    async fn test_existing_table_keeps_its_comments() {
        let workspace = Arc::new(FakeWorkspace::default());
        workspace
            .tables
            .lock()
            .unwrap()
            .insert("main.ops.cluster_usage".to_string());
        let service = TableService::new(workspace.clone(), workspace.clone());
        let file = comments_file();
        let options = TableWriteOptions {
            mode: WriteMode::Append,
            select_columns: Some(vec!["cluster_id".to_string(), "dbus".to_string()]),
            comments_file: Some(file.path().to_path_buf()),
        };

        let summary = service
            .create_table_from_frame(&frame(), &target(), &options)
            .await
            .unwrap();
        assert!(!summary.created);
        assert_eq!(summary.comments_applied, 0);

        let executed = workspace.executed();
        assert_eq!(executed.len(), 2);
        assert!(executed[0].contains("(`cluster_id` STRING, `dbus` DOUBLE)"));
    }

    #[tokio::test]
    async fn test_nested_columns_are_rejected_before_writing() {
        let workspace = Arc::new(FakeWorkspace::default());
        let service = TableService::new(workspace.clone(), workspace.clone());
        let nested = Frame::from_json_rows(&json!([{"owner": {"name": "ana"}}]), &[]).unwrap();

        let err = service
            .create_table_from_frame(&nested, &target(), &TableWriteOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<FrameError>(),
            Some(&FrameError::NestedColumn("owner".to_string()))
        );
        assert!(workspace.executed().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_comments_file_stops_before_any_write() {
        let workspace = Arc::new(FakeWorkspace::default());
        let service = TableService::new(workspace.clone(), workspace.clone());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[not an object").unwrap();
        let options = TableWriteOptions {
            mode: WriteMode::Overwrite,
            select_columns: None,
            comments_file: Some(file.path().to_path_buf()),
        };

        let err = service
            .create_table_from_frame(&frame(), &target(), &options)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BootstrapError>(),
            Some(BootstrapError::Parse { .. })
        ));
        assert!(workspace.executed().is_empty());
    }

    #[tokio::test]
    async fn test_mixed_column_is_written_as_quoted_strings() {
        let workspace = Arc::new(FakeWorkspace::default());
        let service = TableService::new(workspace.clone(), workspace.clone());
        let mixed = Frame::from_json_rows(&json!([{"code": 7}, {"code": "E42"}, {"code": true}]), &[]).unwrap();

        service
            .create_table_from_frame(&mixed, &target(), &TableWriteOptions::default())
            .await
            .unwrap();

        let executed = workspace.executed();
        assert!(executed[0].contains("(`code` STRING)"));
        assert!(executed[1].ends_with("VALUES ('7'), ('E42'), ('true')"));
    }
}
