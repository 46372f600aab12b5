//! Static catalog of EBS health-check queries.
//!
//! Every supported [`Intent`] maps to exactly one [`QueryDescriptor`]. The
//! SQL is split in two parts:
//!
//! - `sql_template`: the `SELECT ... FROM ... WHERE ...` section that the
//!   [`QueryMapper`](crate::mapper::QueryMapper) may extend with filters
//! - `sql_suffix`: grouping, ordering and row limits, never filtered
//!
//! All statements are read-only `SELECT`s against EBS system views.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Named bind parameters for a query, in insertion order.
pub type BindParams = IndexMap<String, String>;

// ============================================================================
// Intent
// ============================================================================

/// Operational-check categories the assistant can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ConcurrentManager,
    ConcurrentRequests,
    Workflow,
    WorkflowStuck,
    InvalidObjects,
    Tablespace,
    TablespaceDetail,
    Alerts,
    ProfileOptions,
    UserSessions,
    /// A question about EBS that maps to no specific check.
    General,
    /// The question could not be understood at all.
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConcurrentManager => "concurrent_manager",
            Self::ConcurrentRequests => "concurrent_requests",
            Self::Workflow => "workflow",
            Self::WorkflowStuck => "workflow_stuck",
            Self::InvalidObjects => "invalid_objects",
            Self::Tablespace => "tablespace",
            Self::TablespaceDetail => "tablespace_detail",
            Self::Alerts => "alerts",
            Self::ProfileOptions => "profile_options",
            Self::UserSessions => "user_sessions",
            Self::General => "general",
            Self::Unknown => "unknown",
        }
    }

    /// Parse an intent label, mapping anything unrecognised to
    /// [`Intent::General`].
    pub fn parse_lenient(label: &str) -> Self {
        label.parse().unwrap_or(Self::General)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let intent = match s.trim().to_ascii_lowercase().as_str() {
            "concurrent_manager" => Self::ConcurrentManager,
            "concurrent_requests" => Self::ConcurrentRequests,
            "workflow" => Self::Workflow,
            "workflow_stuck" => Self::WorkflowStuck,
            "invalid_objects" => Self::InvalidObjects,
            "tablespace" => Self::Tablespace,
            "tablespace_detail" => Self::TablespaceDetail,
            "alerts" => Self::Alerts,
            "profile_options" => Self::ProfileOptions,
            "user_sessions" => Self::UserSessions,
            "general" => Self::General,
            "unknown" => Self::Unknown,
            other => return Err(format!("Unknown intent '{other}'")),
        };
        Ok(intent)
    }
}

// ============================================================================
// Query Descriptor
// ============================================================================

/// A predetermined, parameterised health-check query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDescriptor {
    pub intent: Intent,
    /// Display name.
    pub name: String,
    /// What the check looks at, for operators.
    pub description: String,
    /// Filterable section of the statement.
    pub sql_template: String,
    /// Unfiltered tail of the statement (GROUP BY, ORDER BY, FETCH).
    pub sql_suffix: String,
    pub default_params: BindParams,
}

impl QueryDescriptor {
    fn new(
        intent: Intent,
        name: &str,
        description: &str,
        sql_template: &str,
        sql_suffix: &str,
    ) -> Self {
        Self {
            intent,
            name: name.to_string(),
            description: description.to_string(),
            sql_template: sql_template.trim().to_string(),
            sql_suffix: sql_suffix.trim().to_string(),
            default_params: BindParams::new(),
        }
    }

    /// The full executable statement.
    pub fn sql(&self) -> String {
        if self.sql_suffix.is_empty() {
            self.sql_template.clone()
        } else {
            format!("{}\n{}", self.sql_template, self.sql_suffix)
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Immutable intent → query mapping, built once per process.
#[derive(Debug, Clone)]
pub struct QueryCatalog {
    entries: IndexMap<Intent, QueryDescriptor>,
}

impl QueryCatalog {
    /// The Oracle EBS R12.2 health-check catalog.
    pub fn ebs() -> Self {
        let entries = [
            QueryDescriptor::new(
                Intent::ConcurrentManager,
                "Concurrent Manager Status",
                "Concurrent Manager durumunu ve çalışan işleri kontrol eder",
                CONCURRENT_MANAGER_SQL,
                "ORDER BY fcq.RUNNING_PROCESSES DESC",
            ),
            QueryDescriptor::new(
                Intent::ConcurrentRequests,
                "Running Concurrent Requests",
                "Çalışan ve bekleyen concurrent request'leri listeler",
                CONCURRENT_REQUESTS_SQL,
                "ORDER BY fcr.ACTUAL_START_DATE",
            ),
            QueryDescriptor::new(
                Intent::Workflow,
                "Workflow Status",
                "Oracle Workflow durumunu ve bekleyen iş akışlarını kontrol eder",
                WORKFLOW_SQL,
                WORKFLOW_SUFFIX,
            ),
            QueryDescriptor::new(
                Intent::WorkflowStuck,
                "Stuck Workflows Detail",
                "7 günden uzun süredir açık kalan iş akışlarını listeler",
                WORKFLOW_STUCK_SQL,
                "ORDER BY wi.BEGIN_DATE\nFETCH FIRST 100 ROWS ONLY",
            ),
            QueryDescriptor::new(
                Intent::InvalidObjects,
                "Invalid Database Objects",
                "Veritabanındaki geçersiz (invalid) objeleri listeler",
                INVALID_OBJECTS_SQL,
                "ORDER BY owner, object_type, object_name",
            ),
            QueryDescriptor::new(
                Intent::Tablespace,
                "Tablespace Usage",
                "Tablespace kullanım durumunu ve doluluk oranlarını kontrol eder",
                TABLESPACE_SQL,
                "ORDER BY used_percent DESC",
            ),
            QueryDescriptor::new(
                Intent::TablespaceDetail,
                "Tablespace Detail",
                "Tablespace başına datafile ve boş alan detaylarını gösterir",
                TABLESPACE_DETAIL_SQL,
                "GROUP BY df.TABLESPACE_NAME\nORDER BY used_pct DESC",
            ),
            QueryDescriptor::new(
                Intent::Alerts,
                "Active Alerts",
                "Aktif alertleri ve uyarıları kontrol eder",
                ALERTS_SQL,
                "ORDER BY application_name, alert_name",
            ),
            QueryDescriptor::new(
                Intent::ProfileOptions,
                "Profile Options",
                "Site seviyesindeki profile option değerlerini listeler",
                PROFILE_OPTIONS_SQL,
                "ORDER BY fpo.PROFILE_OPTION_NAME",
            ),
            QueryDescriptor::new(
                Intent::UserSessions,
                "Active User Sessions",
                "Aktif kullanıcı oturumlarını listeler",
                USER_SESSIONS_SQL,
                "ORDER BY fls.START_TIME DESC\nFETCH FIRST 50 ROWS ONLY",
            ),
        ]
        .into_iter()
        .map(|d| (d.intent, d))
        .collect();

        Self { entries }
    }

    pub fn lookup(&self, intent: Intent) -> Option<&QueryDescriptor> {
        self.entries.get(&intent)
    }

    /// All descriptors in declaration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &QueryDescriptor> {
        self.entries.values()
    }

    pub fn intents(&self) -> Vec<Intent> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// SQL
// ============================================================================

const CONCURRENT_MANAGER_SQL: &str = r#"
SELECT
    fcq.CONCURRENT_QUEUE_NAME AS manager_name,
    fcq.RUNNING_PROCESSES AS running,
    fcq.MAX_PROCESSES AS max_processes,
    DECODE(fcq.ENABLED_FLAG, 'Y', 'Enabled', 'Disabled') AS status,
    fcq.CONTROL_CODE,
    TO_CHAR(fcq.LAST_UPDATE_DATE, 'DD-MON-YYYY HH24:MI:SS') AS last_update
FROM
    FND_CONCURRENT_QUEUES fcq,
    FND_APPLICATION fa
WHERE
    fcq.APPLICATION_ID = fa.APPLICATION_ID
    AND fcq.ENABLED_FLAG = 'Y'
"#;

const CONCURRENT_REQUESTS_SQL: &str = r#"
SELECT
    fcr.REQUEST_ID,
    fcp.USER_CONCURRENT_PROGRAM_NAME AS program_name,
    fcr.PHASE_CODE,
    fcr.STATUS_CODE,
    fu.USER_NAME AS requested_by,
    TO_CHAR(fcr.REQUEST_DATE, 'DD-MON-YYYY HH24:MI:SS') AS request_date,
    TO_CHAR(fcr.ACTUAL_START_DATE, 'DD-MON-YYYY HH24:MI:SS') AS start_date,
    ROUND((SYSDATE - fcr.ACTUAL_START_DATE) * 24 * 60, 2) AS running_minutes
FROM
    FND_CONCURRENT_REQUESTS fcr,
    FND_CONCURRENT_PROGRAMS_VL fcp,
    FND_USER fu
WHERE
    fcr.CONCURRENT_PROGRAM_ID = fcp.CONCURRENT_PROGRAM_ID
    AND fcr.PROGRAM_APPLICATION_ID = fcp.APPLICATION_ID
    AND fcr.REQUESTED_BY = fu.USER_ID
    AND fcr.PHASE_CODE = 'R'
"#;

const WORKFLOW_SQL: &str = r#"
SELECT
    wi.ITEM_TYPE,
    wit.DISPLAY_NAME AS workflow_name,
    COUNT(*) AS item_count,
    SUM(CASE WHEN wi.END_DATE IS NULL THEN 1 ELSE 0 END) AS active_count,
    SUM(CASE WHEN wi.END_DATE IS NULL AND wi.BEGIN_DATE < SYSDATE - 7 THEN 1 ELSE 0 END) AS stuck_count,
    MIN(wi.BEGIN_DATE) AS oldest_item
FROM
    WF_ITEMS wi,
    WF_ITEM_TYPES_TL wit
WHERE
    wi.ITEM_TYPE = wit.NAME
    AND wit.LANGUAGE = 'US'
"#;

const WORKFLOW_SUFFIX: &str = r#"
GROUP BY
    wi.ITEM_TYPE,
    wit.DISPLAY_NAME
HAVING
    SUM(CASE WHEN wi.END_DATE IS NULL THEN 1 ELSE 0 END) > 0
ORDER BY
    stuck_count DESC
"#;

const WORKFLOW_STUCK_SQL: &str = r#"
SELECT
    wi.ITEM_TYPE,
    wi.ITEM_KEY,
    wit.DISPLAY_NAME AS workflow_name,
    wi.USER_KEY,
    TO_CHAR(wi.BEGIN_DATE, 'DD-MON-YYYY HH24:MI:SS') AS begin_date,
    ROUND(SYSDATE - wi.BEGIN_DATE) AS days_stuck,
    wi.ROOT_ACTIVITY
FROM
    WF_ITEMS wi,
    WF_ITEM_TYPES_TL wit
WHERE
    wi.ITEM_TYPE = wit.NAME
    AND wit.LANGUAGE = 'US'
    AND wi.END_DATE IS NULL
    AND wi.BEGIN_DATE < SYSDATE - 7
"#;

const INVALID_OBJECTS_SQL: &str = r#"
SELECT
    owner,
    object_name,
    object_type,
    status,
    TO_CHAR(created, 'DD-MON-YYYY') AS created_date,
    TO_CHAR(last_ddl_time, 'DD-MON-YYYY HH24:MI:SS') AS last_ddl
FROM
    DBA_OBJECTS
WHERE
    status = 'INVALID'
    AND owner IN ('APPS', 'AR', 'AP', 'GL', 'INV', 'ONT', 'PO', 'HR')
"#;

const TABLESPACE_SQL: &str = r#"
SELECT
    tablespace_name,
    ROUND(used_space * 8192 / 1024 / 1024 / 1024, 2) AS used_gb,
    ROUND(tablespace_size * 8192 / 1024 / 1024 / 1024, 2) AS total_gb,
    ROUND(used_percent, 2) AS used_percent,
    CASE
        WHEN used_percent >= 90 THEN 'CRITICAL'
        WHEN used_percent >= 80 THEN 'WARNING'
        ELSE 'OK'
    END AS status
FROM
    DBA_TABLESPACE_USAGE_METRICS
"#;

const TABLESPACE_DETAIL_SQL: &str = r#"
SELECT
    df.TABLESPACE_NAME,
    ROUND(SUM(df.BYTES) / 1024 / 1024 / 1024, 2) AS total_gb,
    ROUND(SUM(df.BYTES - NVL(fs.BYTES, 0)) / 1024 / 1024 / 1024, 2) AS used_gb,
    ROUND(NVL(SUM(fs.BYTES), 0) / 1024 / 1024 / 1024, 2) AS free_gb,
    ROUND((SUM(df.BYTES - NVL(fs.BYTES, 0)) / SUM(df.BYTES)) * 100, 2) AS used_pct,
    COUNT(df.FILE_ID) AS datafile_count
FROM
    DBA_DATA_FILES df,
    (SELECT TABLESPACE_NAME, FILE_ID, SUM(BYTES) AS BYTES
     FROM DBA_FREE_SPACE
     GROUP BY TABLESPACE_NAME, FILE_ID) fs
WHERE
    df.TABLESPACE_NAME = fs.TABLESPACE_NAME(+)
    AND df.FILE_ID = fs.FILE_ID(+)
"#;

const ALERTS_SQL: &str = r#"
SELECT
    alert_name,
    application_name,
    enabled_flag,
    frequency_type,
    TO_CHAR(start_date_active, 'DD-MON-YYYY') AS start_date,
    TO_CHAR(end_date_active, 'DD-MON-YYYY') AS end_date
FROM
    ALR_ALERTS_V
WHERE
    enabled_flag = 'Y'
    AND (end_date_active IS NULL OR end_date_active > SYSDATE)
"#;

const PROFILE_OPTIONS_SQL: &str = r#"
SELECT
    fpo.PROFILE_OPTION_NAME,
    fpot.USER_PROFILE_OPTION_NAME,
    fpov.PROFILE_OPTION_VALUE,
    fpov.LEVEL_ID,
    DECODE(fpov.LEVEL_ID,
        10001, 'Site',
        10002, 'Application',
        10003, 'Responsibility',
        10004, 'User',
        'Unknown') AS level_name
FROM
    FND_PROFILE_OPTIONS fpo,
    FND_PROFILE_OPTIONS_TL fpot,
    FND_PROFILE_OPTION_VALUES fpov
WHERE
    fpo.PROFILE_OPTION_ID = fpot.PROFILE_OPTION_ID
    AND fpo.PROFILE_OPTION_NAME = fpov.PROFILE_OPTION_NAME
    AND fpot.LANGUAGE = 'US'
    AND fpov.LEVEL_ID = 10001
"#;

const USER_SESSIONS_SQL: &str = r#"
SELECT
    fu.USER_NAME,
    fr.RESPONSIBILITY_NAME,
    fls.START_TIME,
    ROUND((SYSDATE - fls.START_TIME) * 24, 2) AS session_hours,
    fls.LOGIN_ID
FROM
    FND_LOGINS fl,
    FND_LOGIN_RESP_FORMS fls,
    FND_USER fu,
    FND_RESPONSIBILITY_TL fr
WHERE
    fl.LOGIN_ID = fls.LOGIN_ID
    AND fl.USER_ID = fu.USER_ID
    AND fls.RESPONSIBILITY_ID = fr.RESPONSIBILITY_ID
    AND fls.END_TIME IS NULL
    AND fl.END_TIME IS NULL
"#;

// ============================================================================
// Tests
// ============================================================================
