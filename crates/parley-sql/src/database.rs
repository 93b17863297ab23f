//! SQLite database wrapper for generated queries

use std::fmt;
use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Column, Row};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::guard::check_read_only;
use crate::value::{truncate_chars, SqlValue};

/// Sample cell values in table descriptions are cut to this many chars
const SAMPLE_VALUE_MAX_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    /// Open read-write and skip the read-only guard
    pub allow_writes: bool,
    /// Rows shown under each table in `table_info`
    pub sample_rows_in_table_info: usize,
    /// Restrict the visible tables to these names
    pub include_tables: Option<Vec<String>>,
    /// Text cells in query results are cut to this many chars
    pub max_string_length: usize,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            allow_writes: false,
            sample_rows_in_table_info: 3,
            include_tables: None,
            max_string_length: 300,
        }
    }
}

/// Rows returned by a query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
    max_string_length: usize,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Renders as a list of tuples, e.g. `[('Coast Live Oak', 12), ('Monterey Pine', 3)]`.
/// An empty result renders as an empty string.
impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return Ok(());
        }
        let tuples: Vec<String> = self
            .rows
            .iter()
            .map(|row| {
                let cells: Vec<String> = row
                    .iter()
                    .map(|v| v.to_literal(self.max_string_length))
                    .collect();
                if cells.len() == 1 {
                    format!("({},)", cells[0])
                } else {
                    format!("({})", cells.join(", "))
                }
            })
            .collect();
        write!(f, "[{}]", tuples.join(", "))
    }
}

/// Resolve a database URI to a file path.
///
/// `sqlite:///rel/path` is relative, `sqlite:////abs/path` is absolute,
/// `sqlite://path` and `sqlite:path` are taken as written, anything without
/// a scheme is a plain path.
pub fn parse_sqlite_uri(uri: &str) -> Result<PathBuf, DatabaseError> {
    let path = if let Some(rest) = uri.strip_prefix("sqlite:///") {
        rest
    } else if let Some(rest) = uri.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = uri.strip_prefix("sqlite:") {
        rest
    } else if let Some((scheme, _)) = uri.split_once("://") {
        return Err(DatabaseError::InvalidUri(format!(
            "unsupported scheme '{}' in {}",
            scheme, uri
        )));
    } else {
        uri
    };

    if path.trim().is_empty() {
        return Err(DatabaseError::InvalidUri(format!(
            "missing database path in '{}'",
            uri
        )));
    }
    Ok(PathBuf::from(path))
}

pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Handle to a local SQLite file
#[derive(Debug, Clone)]
pub struct SqlDatabase {
    pool: SqlitePool,
    path: PathBuf,
    options: DatabaseOptions,
}

impl SqlDatabase {
    /// Open `uri` read-only with default options
    pub async fn from_uri(uri: &str) -> Result<Self, DatabaseError> {
        Self::connect(uri, DatabaseOptions::default()).await
    }

    pub async fn connect(uri: &str, options: DatabaseOptions) -> Result<Self, DatabaseError> {
        let path = parse_sqlite_uri(uri)?;
        if !path.exists() {
            return Err(DatabaseError::ConnectionFailed(format!(
                "database file {:?} does not exist",
                path
            )));
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(&path)
            .read_only(!options.allow_writes);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_options)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(
            "Opened SQLite database {:?} (read_only={})",
            path, !options.allow_writes
        );
        Ok(Self {
            pool,
            path,
            options,
        })
    }

    pub fn dialect(&self) -> &'static str {
        "sqlite"
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    /// User tables sorted by name, restricted by `include_tables` when set
    pub async fn usable_table_names(&self) -> Result<Vec<String>, DatabaseError> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(match &self.options.include_tables {
            Some(include) => names.into_iter().filter(|n| include.contains(n)).collect(),
            None => names,
        })
    }

    /// DDL plus sample rows for each requested table (all usable tables when `None`)
    pub async fn table_info(&self, tables: Option<&[String]>) -> Result<String, DatabaseError> {
        let usable = self.usable_table_names().await?;
        let selected: Vec<String> = match tables {
            Some(requested) => {
                if let Some(missing) = requested.iter().find(|t| !usable.contains(t)) {
                    return Err(DatabaseError::TableNotFound(missing.clone()));
                }
                requested.to_vec()
            }
            None => usable,
        };

        let mut parts = Vec::with_capacity(selected.len());
        for table in &selected {
            let ddl: Option<String> = sqlx::query_scalar(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            )
            .bind(table)
            .fetch_optional(&self.pool)
            .await?;
            let ddl = ddl.ok_or_else(|| DatabaseError::TableNotFound(table.clone()))?;

            let mut info = ddl.trim().to_string();
            if self.options.sample_rows_in_table_info > 0 {
                info.push_str("\n\n/*\n");
                info.push_str(&self.sample_rows(table).await?);
                info.push_str("\n*/");
            }
            parts.push(info);
        }

        debug!("Built table info for {} tables", parts.len());
        Ok(parts.join("\n\n"))
    }

    async fn sample_rows(&self, table: &str) -> Result<String, DatabaseError> {
        let limit = self.options.sample_rows_in_table_info;
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
                .bind(table)
                .fetch_all(&self.pool)
                .await?;

        let query = format!("SELECT * FROM {} LIMIT {}", quote_identifier(table), limit);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut lines = vec![
            format!("{} rows from {} table:", limit, table),
            columns.join("\t"),
        ];
        for row in &rows {
            let cells = (0..row.len())
                .map(|i| {
                    SqlValue::decode(row, i)
                        .map(|v| truncate_chars(&v.to_plain_string(), SAMPLE_VALUE_MAX_LEN))
                })
                .collect::<Result<Vec<_>, _>>()?;
            lines.push(cells.join("\t"));
        }
        Ok(lines.join("\n"))
    }

    /// Execute SQL text and collect every row
    pub async fn run(&self, query: &str) -> Result<QueryResult, DatabaseError> {
        if !self.options.allow_writes {
            check_read_only(query)?;
        }

        debug!("Executing SQL: {}", query);
        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let columns = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let values = rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| SqlValue::decode(row, i))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!("Query returned {} rows", values.len());
        Ok(QueryResult {
            columns,
            rows: values,
            max_string_length: self.options.max_string_length,
        })
    }

    /// Like [`run`](Self::run), but failures come back as `Error: ...` text
    pub async fn run_no_throw(&self, query: &str) -> String {
        match self.run(query).await {
            Ok(result) => result.to_string(),
            Err(e) => format!("Error: {}", e),
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
