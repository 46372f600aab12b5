//! Query execution against Oracle, with canned demonstration data.
//!
//! [`Database`] reports one of three outcomes per query: the database is
//! unavailable, the query succeeded, or it failed after connecting.
//! [`DataExecutor`] turns those into a [`QueryResult`], substituting demo
//! data (chosen by intent) whenever the database is unavailable.

use std::sync::Arc;

use async_trait::async_trait;
use oracle::sql_type::{OracleType, ToSql};
use oracle::{Connection, SqlValue};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::catalog::{BindParams, Intent};
use crate::config::OracleConfig;
use crate::mapper::ResolvedQuery;

// ============================================================================
// Result Types
// ============================================================================

/// Column names plus rows of JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Outcome of asking the database capability to run a query.
#[derive(Debug, Clone, PartialEq)]
pub enum DbOutcome {
    /// No connection could be made (missing credentials, network, driver).
    Unavailable(String),
    Success(TabularData),
    /// Connected, but the statement failed.
    Failure(String),
}

/// What the rest of the pipeline sees for an executed query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub succeeded: bool,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub error: Option<String>,
    pub is_demo_data: bool,
}

impl QueryResult {
    fn live(data: TabularData) -> Self {
        Self {
            succeeded: true,
            columns: data.columns,
            rows: data.rows,
            error: None,
            is_demo_data: false,
        }
    }

    fn demo(data: TabularData) -> Self {
        Self {
            is_demo_data: true,
            ..Self::live(data)
        }
    }

    fn failed(error: String) -> Self {
        Self {
            succeeded: false,
            columns: Vec::new(),
            rows: Vec::new(),
            error: Some(error),
            is_demo_data: false,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

// ============================================================================
// Database Capability
// ============================================================================

#[async_trait]
pub trait Database: Send + Sync {
    /// Run a read-only statement with named binds.
    async fn query(&self, sql: &str, params: &BindParams) -> DbOutcome;

    /// Whether a connection can currently be opened.
    async fn ping(&self) -> bool;
}

/// Oracle database reached through the `oracle` driver.
///
/// Each call opens its own connection and closes it before returning.
pub struct OracleDatabase {
    config: Option<OracleConfig>,
}

impl OracleDatabase {
    pub fn new(config: Option<OracleConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Database for OracleDatabase {
    async fn query(&self, sql: &str, params: &BindParams) -> DbOutcome {
        let Some(config) = self.config.clone() else {
            return DbOutcome::Unavailable("Oracle connection is not configured".into());
        };
        let sql = sql.to_string();
        let params = params.clone();

        tokio::task::spawn_blocking(move || query_blocking(&config, &sql, &params))
            .await
            .unwrap_or_else(|e| DbOutcome::Failure(format!("Query task failed: {e}")))
    }

    async fn ping(&self) -> bool {
        let Some(config) = self.config.clone() else {
            return false;
        };

        tokio::task::spawn_blocking(move || match connect(&config) {
            Ok(conn) => {
                close(conn);
                true
            }
            Err(e) => {
                warn!("Oracle connection error: {e}");
                false
            }
        })
        .await
        .unwrap_or(false)
    }
}

fn connect(config: &OracleConfig) -> oracle::Result<Connection> {
    Connection::connect(&config.user, &config.password, config.connect_string())
}

fn close(conn: Connection) {
    if let Err(e) = conn.close() {
        warn!("Failed to close Oracle connection: {e}");
    }
}

fn query_blocking(config: &OracleConfig, sql: &str, params: &BindParams) -> DbOutcome {
    let conn = match connect(config) {
        Ok(conn) => conn,
        Err(e) => return DbOutcome::Unavailable(e.to_string()),
    };

    let outcome = match fetch_all(&conn, sql, params) {
        Ok(data) => DbOutcome::Success(data),
        Err(e) => DbOutcome::Failure(e.to_string()),
    };

    close(conn);
    outcome
}

fn fetch_all(conn: &Connection, sql: &str, params: &BindParams) -> oracle::Result<TabularData> {
    let binds: Vec<(&str, &dyn ToSql)> = params
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect();

    let result_set = conn.query_named(sql, &binds)?;
    let columns = result_set
        .column_info()
        .iter()
        .map(|info| info.name().to_string())
        .collect();

    let mut rows = Vec::new();
    for row in result_set {
        let row = row?;
        let values = row
            .sql_values()
            .iter()
            .map(sql_value_to_json)
            .collect::<oracle::Result<Vec<_>>>()?;
        rows.push(values);
    }

    Ok(TabularData { columns, rows })
}

fn sql_value_to_json(value: &SqlValue) -> oracle::Result<Value> {
    if value.is_null()? {
        return Ok(Value::Null);
    }
    let text: String = value.get()?;
    Ok(match value.oracle_type()? {
        OracleType::Number(_, _)
        | OracleType::Int64
        | OracleType::UInt64
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble => numeric_json(text),
        _ => Value::String(text),
    })
}

/// Render a numeric column's text form as a JSON number where possible.
fn numeric_json(text: String) -> Value {
    if let Ok(int) = text.parse::<i64>() {
        return Value::from(int);
    }
    text.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::String(text))
}

// ============================================================================
// Executor
// ============================================================================

#[derive(Clone)]
pub struct DataExecutor {
    database: Arc<dyn Database>,
}

impl DataExecutor {
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }

    /// Run a resolved query. Never fails: an unreachable database yields
    /// demo data for the query's intent.
    pub async fn run(&self, query: &ResolvedQuery) -> QueryResult {
        match self.database.query(&query.sql(), &query.params).await {
            DbOutcome::Success(data) => {
                debug!(intent = %query.intent(), rows = data.rows.len(), "Query succeeded");
                QueryResult::live(data)
            }
            DbOutcome::Failure(error) => {
                warn!(intent = %query.intent(), "Query failed: {error}");
                QueryResult::failed(error)
            }
            DbOutcome::Unavailable(reason) => {
                debug!(intent = %query.intent(), "Database unavailable ({reason}), serving demo data");
                QueryResult::demo(demo_dataset(query.intent()))
            }
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.database.ping().await
    }
}

// ============================================================================
// Demo Data
// ============================================================================

/// Canned dataset shaped like the live result for `intent`.
pub fn demo_dataset(intent: Intent) -> TabularData {
    let (columns, rows): (&[&str], Vec<Vec<Value>>) = match intent {
        Intent::ConcurrentManager => (
            &["CONCURRENT_QUEUE_NAME", "RUNNING_PROCESSES", "MAX_PROCESSES", "ENABLED_FLAG"],
            vec![
                vec![json!("Standard Manager"), json!(10), json!(20), json!("Y")],
                vec![json!("Conflict Resolution Manager"), json!(1), json!(1), json!("Y")],
                vec![json!("Scheduler"), json!(1), json!(1), json!("Y")],
                vec![json!("Workflow Mailer"), json!(2), json!(5), json!("Y")],
                vec![json!("Output Post Processor"), json!(3), json!(10), json!("Y")],
            ],
        ),
        Intent::Workflow | Intent::WorkflowStuck => (
            &["ITEM_TYPE", "ITEM_KEY", "BEGIN_DATE", "END_DATE", "ROOT_ACTIVITY"],
            vec![
                vec![json!("OEOL"), json!("12345"), json!("2024-01-15"), Value::Null, json!("ORDER_LINE")],
                vec![json!("POAPPRV"), json!("67890"), json!("2024-01-14"), Value::Null, json!("PO_APPROVAL")],
                vec![json!("REQAPPRV"), json!("11111"), json!("2024-01-10"), json!("2024-01-11"), json!("REQ_APPROVAL")],
            ],
        ),
        Intent::InvalidObjects => (
            &["OWNER", "OBJECT_NAME", "OBJECT_TYPE", "STATUS"],
            vec![
                vec![json!("APPS"), json!("XX_CUSTOM_PKG"), json!("PACKAGE BODY"), json!("INVALID")],
                vec![json!("APPS"), json!("XX_TEST_VIEW"), json!("VIEW"), json!("INVALID")],
            ],
        ),
        Intent::Tablespace | Intent::TablespaceDetail => (
            &["TABLESPACE_NAME", "USED_PERCENT", "USED_GB", "MAX_GB"],
            vec![
                vec![json!("APPS_TS_TX_DATA"), json!(75.5), json!(150.2), json!(200)],
                vec![json!("APPS_TS_TX_IDX"), json!(68.3), json!(102.5), json!(150)],
                vec![json!("APPS_TS_MEDIA"), json!(45.0), json!(45.0), json!(100)],
                vec![json!("SYSTEM"), json!(82.1), json!(8.2), json!(10)],
                vec![json!("SYSAUX"), json!(71.0), json!(14.2), json!(20)],
            ],
        ),
        _ => (
            &["INFO"],
            vec![vec![json!("Demo mode - no database connection")]],
        ),
    };

    TabularData {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::QueryCatalog;
    use crate::classifier::Entities;
    use crate::mapper::QueryMapper;
    use std::sync::Mutex;

    /// In-memory database returning a fixed outcome and recording calls.
    pub(crate) struct MockDatabase {
        outcome: DbOutcome,
        pub calls: Mutex<Vec<(String, BindParams)>>,
    }

    impl MockDatabase {
        pub(crate) fn new(outcome: DbOutcome) -> Self {
            Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Database for MockDatabase {
        async fn query(&self, sql: &str, params: &BindParams) -> DbOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((sql.to_string(), params.clone()));
            self.outcome.clone()
        }

        async fn ping(&self) -> bool {
            !matches!(self.outcome, DbOutcome::Unavailable(_))
        }
    }

    fn resolve(intent: Intent) -> ResolvedQuery {
        QueryMapper::new(Arc::new(QueryCatalog::ebs()))
            .resolve(intent, &Entities::default())
            .unwrap()
    }

    #[tokio::test]
    async fn test_unconfigured_oracle_serves_demo_data() {
        let executor = DataExecutor::new(Arc::new(OracleDatabase::new(None)));
        let query = resolve(Intent::ConcurrentManager);
        assert!(query.sql().to_lowercase().contains("fnd_concurrent_queues"));

        let result = executor.run(&query).await;
        assert!(result.succeeded);
        assert!(result.is_demo_data);
        assert_eq!(result.row_count(), 5);
        assert_eq!(result.columns[0], "CONCURRENT_QUEUE_NAME");
        assert!(!executor.is_connected().await);
    }

    #[tokio::test]
    async fn test_demo_data_selected_by_intent() {
        let executor = DataExecutor::new(Arc::new(OracleDatabase::new(None)));
        let expected = [
            (Intent::ConcurrentManager, 5),
            (Intent::ConcurrentRequests, 1),
            (Intent::Workflow, 3),
            (Intent::WorkflowStuck, 3),
            (Intent::InvalidObjects, 2),
            (Intent::Tablespace, 5),
            (Intent::TablespaceDetail, 5),
            (Intent::Alerts, 1),
            (Intent::ProfileOptions, 1),
            (Intent::UserSessions, 1),
        ];
        for (intent, rows) in expected {
            let result = executor.run(&resolve(intent)).await;
            assert!(result.is_demo_data, "{intent}");
            assert_eq!(result.row_count(), rows, "{intent}");
            for row in &result.rows {
                assert_eq!(row.len(), result.columns.len(), "{intent}");
            }
        }
    }

    #[tokio::test]
    async fn test_live_success_passes_rows_through() {
        let data = TabularData {
            columns: vec!["OWNER".into(), "OBJECT_NAME".into()],
            rows: vec![vec![json!("AR"), json!("AR_PKG")]],
        };
        let db = Arc::new(MockDatabase::new(DbOutcome::Success(data.clone())));
        let executor = DataExecutor::new(db.clone());

        let query = QueryMapper::new(Arc::new(QueryCatalog::ebs()))
            .resolve(
                Intent::InvalidObjects,
                &Entities {
                    schema_name: Some("ar".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let result = executor.run(&query).await;

        assert!(result.succeeded);
        assert!(!result.is_demo_data);
        assert_eq!(result.columns, data.columns);
        assert_eq!(result.rows, data.rows);

        let calls = db.calls.lock().unwrap();
        assert_eq!(calls[0].0, query.sql());
        assert_eq!(calls[0].1["owner"], "AR");
    }

    #[tokio::test]
    async fn test_live_failure_reports_error() {
        let db = Arc::new(MockDatabase::new(DbOutcome::Failure(
            "ORA-00942: table or view does not exist".into(),
        )));
        let result = DataExecutor::new(db).run(&resolve(Intent::Alerts)).await;

        assert!(!result.succeeded);
        assert!(!result.is_demo_data);
        assert!(result.columns.is_empty());
        assert!(result.rows.is_empty());
        assert_eq!(
            result.error.as_deref(),
            Some("ORA-00942: table or view does not exist")
        );
    }

    #[tokio::test]
    async fn test_unreachable_database_serves_demo_data() {
        let db = Arc::new(MockDatabase::new(DbOutcome::Unavailable(
            "ORA-12541: TNS:no listener".into(),
        )));
        let result = DataExecutor::new(db).run(&resolve(Intent::Tablespace)).await;
        assert!(result.is_demo_data);
        assert_eq!(result.row_count(), 5);
    }

    #[test]
    fn test_numeric_json() {
        assert_eq!(numeric_json("42".into()), json!(42));
        assert_eq!(numeric_json("75.5".into()), json!(75.5));
        assert_eq!(numeric_json(".5".into()), json!(0.5));
        assert_eq!(numeric_json("n/a".into()), json!("n/a"));
    }
}
