//! Intent → SQL resolution with entity-driven filters.
//!
//! Filters only ever reference named bind placeholders (`:manager_name`,
//! `:owner`); extracted entity text travels exclusively as a bind value.

use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::catalog::{BindParams, Intent, QueryCatalog, QueryDescriptor};
use crate::classifier::Entities;

/// Predicate inserted for a manager-name filter.
pub const MANAGER_FILTER: &str = "UPPER(fcq.CONCURRENT_QUEUE_NAME) LIKE UPPER(:manager_name)";

/// Predicate inserted for a schema-owner filter.
pub const OWNER_FILTER: &str = "owner = :owner";

pub const WORKFLOW_STUCK_CLAUSE: &str = "AND wi.END_DATE IS NULL AND wi.BEGIN_DATE < SYSDATE - 7";
pub const WORKFLOW_ACTIVE_CLAUSE: &str = "AND wi.END_DATE IS NULL";
pub const WORKFLOW_COMPLETED_CLAUSE: &str = "AND wi.END_DATE IS NOT NULL";

/// A catalog query after entity filters have been applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedQuery {
    pub descriptor: QueryDescriptor,
    pub params: BindParams,
}

impl ResolvedQuery {
    pub fn intent(&self) -> Intent {
        self.descriptor.intent
    }

    pub fn sql(&self) -> String {
        self.descriptor.sql()
    }
}

/// Selects catalog queries and applies deterministic filter rules.
#[derive(Debug, Clone)]
pub struct QueryMapper {
    catalog: Arc<QueryCatalog>,
    where_keyword: Regex,
}

impl QueryMapper {
    pub fn new(catalog: Arc<QueryCatalog>) -> Self {
        Self {
            catalog,
            where_keyword: Regex::new(r"(?i)\bWHERE\b").expect("WHERE pattern is valid"),
        }
    }

    pub fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }

    /// Resolve an intent to an executable query.
    ///
    /// Returns `None` when the intent has no catalog entry; callers treat
    /// that as "nothing to execute". The catalog entry itself is never
    /// modified.
    pub fn resolve(&self, intent: Intent, entities: &Entities) -> Option<ResolvedQuery> {
        let mut descriptor = self.catalog.lookup(intent)?.clone();
        let mut params = descriptor.default_params.clone();

        match intent {
            Intent::ConcurrentManager => {
                if let Some(manager) = present(&entities.manager_name)
                    && let Some(sql) = self.insert_after_where(&descriptor.sql_template, MANAGER_FILTER)
                {
                    descriptor.sql_template = sql;
                    params.insert("manager_name".to_string(), format!("%{manager}%"));
                }
            }
            Intent::InvalidObjects => {
                if let Some(schema) = present(&entities.schema_name)
                    && let Some(sql) = self.insert_after_where(&descriptor.sql_template, OWNER_FILTER)
                {
                    descriptor.sql_template = sql;
                    params.insert("owner".to_string(), schema.to_uppercase());
                }
            }
            Intent::Workflow => {
                if let Some(status) = present(&entities.status_filter)
                    && let Some(clause) = workflow_status_clause(status)
                {
                    descriptor.sql_template = format!("{}\n    {clause}", descriptor.sql_template);
                }
            }
            _ => {}
        }

        debug!(intent = %intent, params = params.len(), "Resolved query");
        Some(ResolvedQuery { descriptor, params })
    }

    /// Insert `predicate AND` right after the first `WHERE` keyword.
    ///
    /// Returns `None` when the statement has no `WHERE`.
    fn insert_after_where(&self, sql: &str, predicate: &str) -> Option<String> {
        let keyword = self.where_keyword.find(sql)?;
        let (head, tail) = sql.split_at(keyword.end());
        Some(format!("{head} {predicate} AND{tail}"))
    }
}

/// Map a workflow status label to its extra clause.
fn workflow_status_clause(status: &str) -> Option<&'static str> {
    match status.trim().to_uppercase().as_str() {
        "STUCK" => Some(WORKFLOW_STUCK_CLAUSE),
        "ACTIVE" => Some(WORKFLOW_ACTIVE_CLAUSE),
        "COMPLETED" => Some(WORKFLOW_COMPLETED_CLAUSE),
        _ => None,
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> QueryMapper {
        QueryMapper::new(Arc::new(QueryCatalog::ebs()))
    }

    fn entities(manager: Option<&str>, schema: Option<&str>, status: Option<&str>) -> Entities {
        Entities {
            manager_name: manager.map(String::from),
            schema_name: schema.map(String::from),
            status_filter: status.map(String::from),
        }
    }

    #[test]
    fn test_no_entities_returns_catalog_entry_unchanged() {
        let mapper = mapper();
        let catalog = QueryCatalog::ebs();
        for descriptor in catalog.descriptors() {
            let resolved = mapper
                .resolve(descriptor.intent, &Entities::default())
                .unwrap();
            assert_eq!(&resolved.descriptor, descriptor);
            assert_eq!(resolved.params, descriptor.default_params);
        }
    }

    #[test]
    fn test_unmapped_intents_resolve_to_none() {
        let mapper = mapper();
        assert!(mapper.resolve(Intent::General, &Entities::default()).is_none());
        assert!(mapper.resolve(Intent::Unknown, &Entities::default()).is_none());
    }

    #[test]
    fn test_manager_filter_binds_like_pattern() {
        let resolved = mapper()
            .resolve(Intent::ConcurrentManager, &entities(Some("Standard"), None, None))
            .unwrap();

        assert_eq!(resolved.params["manager_name"], "%Standard%");
        assert!(
            resolved
                .descriptor
                .sql_template
                .contains(&format!("WHERE {MANAGER_FILTER} AND\n"))
        );
        assert!(!resolved.sql().contains("Standard"));
    }

    #[test]
    fn test_schema_filter_binds_uppercase_owner() {
        let resolved = mapper()
            .resolve(Intent::InvalidObjects, &entities(None, Some("apps"), None))
            .unwrap();

        assert_eq!(resolved.params["owner"], "APPS");
        assert!(resolved.descriptor.sql_template.contains("WHERE owner = :owner AND"));
        assert!(!resolved.sql().contains("apps"));
    }

    #[test]
    fn test_entities_for_other_intents_are_ignored() {
        let mapper = mapper();
        let catalog = QueryCatalog::ebs();

        let resolved = mapper
            .resolve(Intent::Tablespace, &entities(Some("Standard"), Some("apps"), Some("STUCK")))
            .unwrap();
        assert_eq!(&resolved.descriptor, catalog.lookup(Intent::Tablespace).unwrap());
        assert!(resolved.params.is_empty());

        let resolved = mapper
            .resolve(Intent::Workflow, &entities(Some("Standard"), Some("apps"), None))
            .unwrap();
        assert_eq!(&resolved.descriptor, catalog.lookup(Intent::Workflow).unwrap());
    }

    #[test]
    fn test_workflow_status_clauses_are_appended_once() {
        let mapper = mapper();
        let cases = [
            ("STUCK", WORKFLOW_STUCK_CLAUSE),
            ("active", WORKFLOW_ACTIVE_CLAUSE),
            ("Completed", WORKFLOW_COMPLETED_CLAUSE),
        ];

        for (status, clause) in cases {
            let resolved = mapper
                .resolve(Intent::Workflow, &entities(None, None, Some(status)))
                .unwrap();
            let template = &resolved.descriptor.sql_template;
            assert!(template.ends_with(clause), "{status}");
            assert_eq!(template.matches(clause).count(), 1, "{status}");
            assert!(resolved.params.is_empty());
            // Clause lands before GROUP BY in the executable statement.
            let sql = resolved.sql();
            assert!(sql.find(clause).unwrap() < sql.find("GROUP BY").unwrap());
        }
    }

    #[test]
    fn test_unknown_workflow_status_leaves_template_unchanged() {
        let resolved = mapper()
            .resolve(Intent::Workflow, &entities(None, None, Some("RUNNING")))
            .unwrap();
        let catalog = QueryCatalog::ebs();
        assert_eq!(&resolved.descriptor, catalog.lookup(Intent::Workflow).unwrap());
    }

    #[test]
    fn test_blank_entity_is_treated_as_absent() {
        let resolved = mapper()
            .resolve(Intent::ConcurrentManager, &entities(Some("   "), None, None))
            .unwrap();
        assert!(resolved.params.is_empty());
        assert!(!resolved.descriptor.sql_template.contains(":manager_name"));
    }

    #[test]
    fn test_insert_after_where_without_where_is_noop() {
        let mapper = mapper();
        assert!(mapper.insert_after_where("SELECT 1 FROM dual", OWNER_FILTER).is_none());
    }

    #[test]
    fn test_insert_after_where_matches_keyword_case_insensitively() {
        let mapper = mapper();
        let sql = mapper
            .insert_after_where("select x from somewhere where y = 1", OWNER_FILTER)
            .unwrap();
        assert_eq!(sql, "select x from somewhere where owner = :owner AND y = 1");
    }

    #[test]
    fn test_catalog_is_not_mutated() {
        let mapper = mapper();
        mapper
            .resolve(Intent::ConcurrentManager, &entities(Some("Standard"), None, None))
            .unwrap();
        let entry = mapper.catalog().lookup(Intent::ConcurrentManager).unwrap();
        assert!(!entry.sql_template.contains(":manager_name"));
    }
}
