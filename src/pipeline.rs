//! Question → intent → query → result → prose.

use serde::Serialize;
use tracing::info;

use crate::catalog::{Intent, QueryCatalog};
use crate::classifier::{ClassificationMethod, IntentClassifier};
use crate::executor::DataExecutor;
use crate::formatter::ResponseFormatter;
use crate::mapper::QueryMapper;

pub const NOT_UNDERSTOOD_MESSAGE: &str =
    "Sorunuzu anlayamadım. Lütfen Oracle EBS ile ilgili bir soru sorun.";

/// Outcome of answering one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub intent: Intent,
    pub query_executed: bool,
    pub row_count: usize,
    pub method: ClassificationMethod,
    /// Whether the rows came from demo data.
    pub demo: bool,
}

/// What [`Assistant::ask`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum AskOutcome {
    Answered(Answer),
    /// The question was classified as unintelligible; nothing ran.
    NotUnderstood,
}

/// The full question-answering pipeline.
#[derive(Clone)]
pub struct Assistant {
    classifier: IntentClassifier,
    mapper: QueryMapper,
    executor: DataExecutor,
    formatter: ResponseFormatter,
}

impl Assistant {
    pub fn new(
        classifier: IntentClassifier,
        mapper: QueryMapper,
        executor: DataExecutor,
        formatter: ResponseFormatter,
    ) -> Self {
        Self {
            classifier,
            mapper,
            executor,
            formatter,
        }
    }

    pub fn catalog(&self) -> &QueryCatalog {
        self.mapper.catalog()
    }

    pub async fn database_connected(&self) -> bool {
        self.executor.is_connected().await
    }

    /// Answer a (non-empty) question.
    pub async fn ask(&self, question: &str) -> AskOutcome {
        let classification = self.classifier.classify(question).await;
        if !classification.succeeded {
            info!("Question not understood");
            return AskOutcome::NotUnderstood;
        }

        let intent = classification.intent;
        let result = match self.mapper.resolve(intent, &classification.entities) {
            Some(query) => Some(self.executor.run(&query).await),
            None => None,
        };

        let answer = self.formatter.format(question, intent, result.as_ref()).await;

        let row_count = result.as_ref().map_or(0, |r| r.row_count());
        info!(
            intent = %intent,
            method = ?classification.method,
            confidence = classification.confidence,
            rows = row_count,
            "Answered question"
        );

        AskOutcome::Answered(Answer {
            answer,
            intent,
            query_executed: result.is_some(),
            row_count,
            method: classification.method,
            demo: result.as_ref().is_some_and(|r| r.is_demo_data),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::executor::tests::MockDatabase;
    use crate::executor::{Database, DbOutcome, OracleDatabase, TabularData};
    use crate::llm::{LlmClient, MockLlmClient};

    pub(crate) fn assistant(llm: Option<Arc<dyn LlmClient>>, database: Arc<dyn Database>) -> Assistant {
        Assistant::new(
            IntentClassifier::new(llm.clone()),
            QueryMapper::new(Arc::new(QueryCatalog::ebs())),
            DataExecutor::new(database),
            ResponseFormatter::new(llm, "persona".into()),
        )
    }

    fn offline() -> Assistant {
        assistant(None, Arc::new(OracleDatabase::new(None)))
    }

    fn answered(outcome: AskOutcome) -> Answer {
        match outcome {
            AskOutcome::Answered(answer) => answer,
            AskOutcome::NotUnderstood => panic!("expected an answer"),
        }
    }

    #[tokio::test]
    async fn test_offline_tablespace_question() {
        let answer = answered(offline().ask("tablespace durumu nedir").await);
        assert_eq!(answer.intent, Intent::Tablespace);
        assert!(answer.query_executed);
        assert_eq!(answer.row_count, 5);
        assert!(answer.demo);
        assert_eq!(answer.method, ClassificationMethod::Keyword);
        assert!(answer.answer.contains("APPS_TS_TX_DATA"));
    }

    #[tokio::test]
    async fn test_general_question_runs_no_query() {
        let answer = answered(offline().ask("merhaba").await);
        assert_eq!(answer.intent, Intent::General);
        assert!(!answer.query_executed);
        assert_eq!(answer.row_count, 0);
        assert!(!answer.demo);
        assert_eq!(answer.answer, crate::formatter::NOT_EXECUTED_MESSAGE);
    }

    #[tokio::test]
    async fn test_llm_unknown_short_circuits() {
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new(vec![
            r#"{"intent":"unknown","confidence":0.2}"#.into(),
        ]));
        let db = Arc::new(MockDatabase::new(DbOutcome::Unavailable("n/a".into())));
        let outcome = assistant(Some(llm), db.clone()).ask("xyzzy").await;

        assert_eq!(outcome, AskOutcome::NotUnderstood);
        assert!(db.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entities_flow_into_bind_params() {
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new(vec![
            r#"{"intent":"concurrent_manager","entities":{"manager_name":"Standard"},"confidence":0.9}"#.into(),
            "Standard Manager 10 process ile çalışıyor.".into(),
        ]));
        let db = Arc::new(MockDatabase::new(DbOutcome::Success(TabularData {
            columns: vec!["MANAGER_NAME".into()],
            rows: vec![vec![json!("Standard Manager")]],
        })));

        let answer = answered(assistant(Some(llm), db.clone()).ask("Standard manager ne durumda?").await);
        assert_eq!(answer.intent, Intent::ConcurrentManager);
        assert_eq!(answer.method, ClassificationMethod::Llm);
        assert_eq!(answer.row_count, 1);
        assert!(!answer.demo);
        assert_eq!(answer.answer, "Standard Manager 10 process ile çalışıyor.");

        let calls = db.calls.lock().unwrap();
        assert_eq!(calls[0].1["manager_name"], "%Standard%");
        assert!(calls[0].0.contains(":manager_name"));
    }

    #[tokio::test]
    async fn test_query_failure_still_answers() {
        let db = Arc::new(MockDatabase::new(DbOutcome::Failure("ORA-00942".into())));
        let answer = answered(assistant(None, db).ask("invalid objeler").await);
        assert!(answer.query_executed);
        assert_eq!(answer.row_count, 0);
        assert_eq!(answer.answer, "Sorgu hatası: ORA-00942");
    }
}
