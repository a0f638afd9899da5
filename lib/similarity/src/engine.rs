//! The accident similarity engine.
//!
//! Owns the [`RecordStore`] and ties it to the embedding and completion
//! capabilities and to the accident repository. Every outbound model call is
//! bounded by [`EngineConfig::call_timeout`].

use crate::client::{CompletionClient, CompletionOptions, EmbeddingClient};
use crate::prompt::{alert_prompt, summarize, NO_NEARBY_ACCIDENTS};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use vialert_core::{
    format_report_date, parse_report_date, top_k, AccidentRecord, Error, RecordStore, Result,
    Vector,
};
use vialert_storage::loader::describe;
use vialert_storage::{Accident, AccidentRepository, DatasetLoader, DatasetRow, NewAccident};

/// Number of neighbours returned by a similarity query.
pub const TOP_K: usize = 10;

/// Stand-ins for fields a submitted report does not carry.
const UNKNOWN_SEVERITY: &str = "desconocida";
const UNKNOWN_LOCALITY: &str = "desconocido";

const MSG_REGISTERED: &str = "Accidente registrado correctamente";
const MSG_ALREADY_INDEXED: &str = "Accidente registrado; ya existía en el índice de similitud";
const MSG_NOT_INDEXED: &str = "Accidente guardado pero no indexado";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub top_k: usize,
    pub call_timeout: Duration,
    pub chat_model: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k: TOP_K,
            call_timeout: Duration::from_secs(30),
            chat_model: crate::openai::DEFAULT_CHAT_MODEL.to_string(),
        }
    }
}

/// A newly reported accident, date in `DD/MM/YYYY`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccidentReport {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "type")]
    pub accident_type: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Result of an ingestion, always returned instead of an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub message: String,
    pub is_error: bool,
}

impl IngestOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: false,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: true,
        }
    }
}

/// Reject a missing or blank required text field.
pub fn require_text<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::InvalidArgument(format!("{} must not be empty", field))),
    }
}

pub struct SimilarityEngine {
    store: RecordStore,
    embedder: Arc<dyn EmbeddingClient>,
    completer: Arc<dyn CompletionClient>,
    repository: Arc<dyn AccidentRepository>,
    config: EngineConfig,
}

impl SimilarityEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        completer: Arc<dyn CompletionClient>,
        repository: Arc<dyn AccidentRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store: RecordStore::new(),
            embedder,
            completer,
            repository,
            config,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn bounded<T>(
        &self,
        what: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.config.call_timeout, call)
            .await
            .map_err(|_| Error::Timeout(self.config.call_timeout, what))?
    }

    /// Embed a batch, checking that one vector came back per text.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vector>> {
        let expected = texts.len();
        let vectors = self
            .bounded("embedding", self.embedder.embed(&texts))
            .await?;
        if vectors.len() != expected {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                expected,
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    async fn embed_one(&self, text: String) -> Result<Vector> {
        self.embed(vec![text])
            .await?
            .pop()
            .ok_or_else(|| Error::Embedding("empty embedding response".to_string()))
    }

    /// Read the dataset and index it. Any failure here should abort startup.
    pub async fn load_dataset(&self, loader: &DatasetLoader) -> Result<usize> {
        let rows = loader.load()?;
        self.index_rows(rows).await
    }

    /// Embed all rows in one call and add them to the store.
    pub async fn index_rows(&self, rows: Vec<DatasetRow>) -> Result<usize> {
        if rows.is_empty() {
            info!("Dataset has no usable rows; starting with an empty index");
            return Ok(0);
        }

        let descriptions: Vec<String> = rows.iter().map(|r| r.description.clone()).collect();
        let vectors = self.embed(descriptions).await?;

        let records: Vec<AccidentRecord> = rows
            .into_iter()
            .zip(vectors)
            .map(|(row, vector)| {
                AccidentRecord::new(Some(row.date), row.address, row.accident_type, vector)
            })
            .collect();

        let added = self.store.append_batch(records)?;
        info!(
            "Indexed {} dataset records (dimension {:?})",
            added,
            self.store.dimension()
        );
        Ok(added)
    }

    /// The most similar records with their scores, most similar first.
    pub async fn find_similar_scored(&self, address: &str) -> Result<Vec<(AccidentRecord, f32)>> {
        let address = require_text(Some(address), "address")?;
        if self.store.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embed_one(address.to_string()).await?;
        if let Some(expected) = self.store.dimension() {
            if expected != query.dim() {
                return Err(Error::InvalidDimension {
                    expected,
                    actual: query.dim(),
                });
            }
        }

        let ranked = self.store.with_records(|records| {
            top_k(records.iter(), self.config.top_k, |record| {
                record
                    .embedding
                    .as_ref()
                    .map(|e| e.cosine_similarity(&query))
                    .unwrap_or(0.0)
            })
            .into_iter()
            .map(|(record, score)| (record.stripped(), score))
            .collect::<Vec<_>>()
        });

        debug!(
            "Similarity query {:?}: {} results, best score {:?}",
            address,
            ranked.len(),
            ranked.first().map(|(_, s)| *s)
        );
        Ok(ranked)
    }

    /// The most similar records, embeddings stripped.
    pub async fn find_similar(&self, address: &str) -> Result<Vec<AccidentRecord>> {
        Ok(self
            .find_similar_scored(address)
            .await?
            .into_iter()
            .map(|(record, _)| record)
            .collect())
    }

    /// Advisory text for an address, or a fixed message when nothing similar
    /// is on record.
    pub async fn generate_alert(&self, address: &str) -> Result<String> {
        let neighbours = self.find_similar(address).await?;
        if neighbours.is_empty() {
            return Ok(NO_NEARBY_ACCIDENTS.to_string());
        }

        let prompt = alert_prompt(address, &summarize(&neighbours));
        let options = CompletionOptions::advisory(self.config.chat_model.clone());
        self.bounded("completion", self.completer.complete(&prompt, &options))
            .await
    }

    /// Persist a reported accident and merge it into the index.
    ///
    /// Never fails: every error becomes an `IngestOutcome` with `is_error`.
    pub async fn register_accident(&self, report: AccidentReport) -> IngestOutcome {
        let saved = match self.persist_report(report).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Failed to register accident: {}", e);
                return IngestOutcome::failure(e.to_string());
            }
        };

        let id = saved.id;
        match self.index_accident(saved).await {
            Ok(true) => IngestOutcome::success(MSG_REGISTERED),
            Ok(false) => IngestOutcome::success(MSG_ALREADY_INDEXED),
            Err(e) => {
                warn!("Accident {} persisted but not indexed: {}", id, e);
                IngestOutcome::failure(format!("{}: {}", MSG_NOT_INDEXED, e))
            }
        }
    }

    /// Validate a report and save it. Nothing is written when validation fails.
    async fn persist_report(&self, report: AccidentReport) -> Result<Accident> {
        let address = require_text(report.address.as_deref(), "address")?.to_string();
        let accident_type = require_text(report.accident_type.as_deref(), "type")?.to_string();
        let date = parse_report_date(report.date.as_deref().unwrap_or_default())?;

        let repository = self.repository.clone();
        let saved = tokio::task::spawn_blocking(move || {
            repository.save(NewAccident {
                date,
                address,
                accident_type,
            })
        })
        .await
        .map_err(|e| Error::Repository(e.to_string()))??;
        debug!("Persisted accident {}", saved.id);
        Ok(saved)
    }

    /// Embed a saved accident and add it to the store unless already present.
    async fn index_accident(&self, saved: Accident) -> Result<bool> {
        let description = describe(
            &saved.accident_type,
            UNKNOWN_SEVERITY,
            UNKNOWN_LOCALITY,
            &saved.address,
        );
        let vector = self.embed_one(description).await?;

        let record = AccidentRecord::new(
            saved.date.as_ref().map(format_report_date),
            saved.address,
            saved.accident_type,
            vector,
        );
        let added = self.store.append_unique(record)?;
        if added {
            info!("Indexed reported accident {} ({} records)", saved.id, self.store.len());
        } else {
            info!("Accident {} already indexed, skipped", saved.id);
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vialert_storage::InMemoryAccidentRepository;

    /// Embeds a text by the address after its last ", " so a description
    /// and a bare address query land on the same vector.
    struct AddressEmbedder {
        calls: AtomicUsize,
    }

    fn address_key(text: &str) -> &str {
        text.rsplit(", ").next().unwrap_or(text)
    }

    fn address_vector(text: &str) -> Vector {
        let mut v = vec![0.1f32; 8];
        for (i, b) in address_key(text).bytes().enumerate() {
            v[i % 8] += f32::from(b) / 255.0 * (1.0 + i as f32);
        }
        Vector::new(v)
    }

    #[async_trait]
    impl EmbeddingClient for AddressEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vector>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| address_vector(t)).collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingClient for FailingEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vector>> {
            Err(Error::Embedding("service unavailable".to_string()))
        }
    }

    struct SlowEmbedder;

    #[async_trait]
    impl EmbeddingClient for SlowEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vector>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(texts.iter().map(|t| address_vector(t)).collect())
        }
    }

    #[derive(Default)]
    struct RecordingCompleter {
        prompts: Mutex<Vec<(String, CompletionOptions)>>,
    }

    #[async_trait]
    impl CompletionClient for RecordingCompleter {
        async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String> {
            self.prompts.lock().push((prompt.to_string(), options.clone()));
            Ok("Evite la Calle 80".to_string())
        }
    }

    struct FailingRepository;

    impl AccidentRepository for FailingRepository {
        fn save(&self, _accident: NewAccident) -> Result<vialert_storage::Accident> {
            Err(Error::Repository("database offline".to_string()))
        }
        fn find(&self, _id: u64) -> Result<Option<vialert_storage::Accident>> {
            Ok(None)
        }
        fn count(&self) -> Result<usize> {
            Ok(0)
        }
    }

    struct Harness {
        engine: SimilarityEngine,
        embedder: Arc<AddressEmbedder>,
        completer: Arc<RecordingCompleter>,
        repository: Arc<InMemoryAccidentRepository>,
    }

    fn harness() -> Harness {
        let embedder = Arc::new(AddressEmbedder {
            calls: AtomicUsize::new(0),
        });
        let completer = Arc::new(RecordingCompleter::default());
        let repository = Arc::new(InMemoryAccidentRepository::new());
        let engine = SimilarityEngine::new(
            embedder.clone(),
            completer.clone(),
            repository.clone(),
            EngineConfig::default(),
        );
        Harness {
            engine,
            embedder,
            completer,
            repository,
        }
    }

    fn report(address: &str, kind: &str, date: &str) -> AccidentReport {
        AccidentReport {
            address: Some(address.to_string()),
            accident_type: Some(kind.to_string()),
            date: Some(date.to_string()),
        }
    }

    fn rows(n: usize) -> Vec<DatasetRow> {
        (0..n)
            .map(|i| DatasetRow {
                description: describe("Choque", "Grave", "Suba", &format!("Calle {}", i)),
                date: "10/03/2024".to_string(),
                address: format!("Calle {}", i),
                accident_type: "Choque".to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_index_rows_embeds_in_one_call() {
        let h = harness();
        assert_eq!(h.engine.index_rows(rows(25)).await.unwrap(), 25);
        assert_eq!(h.engine.store().len(), 25);
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_query_returns_at_most_k_sorted() {
        let h = harness();
        h.engine.index_rows(rows(40)).await.unwrap();

        let ranked = h.engine.find_similar_scored("Calle 7").await.unwrap();
        assert_eq!(ranked.len(), TOP_K);
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
        assert_eq!(ranked[0].0.address, "Calle 7");
        assert!((ranked[0].1 - 1.0).abs() < 1e-5);
        assert!(ranked.iter().all(|(r, _)| r.embedding.is_none()));
    }

    #[tokio::test]
    async fn test_blank_query_rejected_before_embedding() {
        let h = harness();
        h.engine.index_rows(rows(3)).await.unwrap();
        let calls = h.embedder.calls.load(Ordering::SeqCst);

        let err = h.engine.find_similar("  ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_empty_store_alert_skips_completion() {
        let h = harness();
        assert!(h.engine.find_similar("Calle 80").await.unwrap().is_empty());
        let alert = h.engine.generate_alert("Calle 80").await.unwrap();
        assert_eq!(alert, NO_NEARBY_ACCIDENTS);
        assert!(h.completer.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_alert_sends_prompt_with_fixed_options() {
        let h = harness();
        h.engine.index_rows(rows(3)).await.unwrap();

        let alert = h.engine.generate_alert("Calle 1").await.unwrap();
        assert_eq!(alert, "Evite la Calle 80");

        let prompts = h.completer.prompts.lock();
        assert_eq!(prompts.len(), 1);
        let (prompt, options) = &prompts[0];
        assert!(prompt.contains("similares a \"Calle 1\""));
        assert!(prompt.contains("📅 10/03/2024 | 📍 Calle 1 | 🚗 Choque"));
        assert_eq!(options, &CompletionOptions::advisory("gpt-3.5-turbo"));
    }

    #[tokio::test]
    async fn test_register_new_accident() {
        let h = harness();
        h.engine.index_rows(rows(5)).await.unwrap();

        let outcome = h
            .engine
            .register_accident(report("Carrera 7", "Atropello", "15/04/2024"))
            .await;
        assert_eq!(outcome, IngestOutcome::success(MSG_REGISTERED));
        assert_eq!(h.engine.store().len(), 6);
        assert_eq!(h.repository.count().unwrap(), 1);

        let ranked = h.engine.find_similar_scored("Carrera 7").await.unwrap();
        assert_eq!(ranked[0].0.address, "Carrera 7");
        assert_eq!(ranked[0].0.date.as_deref(), Some("15/04/2024"));
        assert!((ranked[0].1 - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_register_twice_keeps_one_record() {
        let h = harness();
        let first = h
            .engine
            .register_accident(report("Carrera 7", "Atropello", "15/04/2024"))
            .await;
        let second = h
            .engine
            .register_accident(report("Carrera 7", "Atropello", "15/04/2024"))
            .await;
        assert!(!first.is_error);
        assert_eq!(second, IngestOutcome::success(MSG_ALREADY_INDEXED));
        assert_eq!(h.engine.store().len(), 1);
    }

    #[tokio::test]
    async fn test_register_without_date_uses_unknown_date() {
        let h = harness();
        h.engine
            .register_accident(report("Carrera 7", "Atropello", ""))
            .await;
        let outcome = h
            .engine
            .register_accident(report("Carrera 7", "Atropello", "  "))
            .await;
        assert_eq!(outcome, IngestOutcome::success(MSG_ALREADY_INDEXED));
        h.engine.store().scan(|r| assert_eq!(r.date, None));
    }

    #[tokio::test]
    async fn test_invalid_date_fails_before_persistence() {
        let h = harness();
        let outcome = h
            .engine
            .register_accident(report("Carrera 7", "Atropello", "31/02/2024"))
            .await;
        assert!(outcome.is_error);
        assert!(outcome.message.contains("31/02/2024"));
        assert_eq!(h.repository.count().unwrap(), 0);
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
        assert!(h.engine.store().is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields_are_validation_failures() {
        let h = harness();
        let outcome = h
            .engine
            .register_accident(AccidentReport {
                address: None,
                accident_type: Some("Choque".to_string()),
                date: Some("10/03/2024".to_string()),
            })
            .await;
        assert!(outcome.is_error);
        assert_eq!(h.repository.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_repository_failure_becomes_outcome() {
        let embedder = Arc::new(AddressEmbedder {
            calls: AtomicUsize::new(0),
        });
        let engine = SimilarityEngine::new(
            embedder.clone(),
            Arc::new(RecordingCompleter::default()),
            Arc::new(FailingRepository),
            EngineConfig::default(),
        );
        let outcome = engine
            .register_accident(report("Carrera 7", "Atropello", "15/04/2024"))
            .await;
        assert!(outcome.is_error);
        assert!(outcome.message.contains("database offline"));
        assert!(!outcome.message.starts_with(MSG_NOT_INDEXED));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert!(engine.store().is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_becomes_outcome_but_propagates_on_query() {
        let engine = SimilarityEngine::new(
            Arc::new(FailingEmbedder),
            Arc::new(RecordingCompleter::default()),
            Arc::new(InMemoryAccidentRepository::new()),
            EngineConfig::default(),
        );
        let outcome = engine
            .register_accident(report("Carrera 7", "Atropello", "15/04/2024"))
            .await;
        assert!(outcome.is_error);
        assert!(outcome.message.starts_with(MSG_NOT_INDEXED), "{}", outcome.message);
        assert!(engine.index_rows(rows(2)).await.is_err());

        // Only reachable with a populated store, so seed it directly.
        engine
            .store()
            .append(AccidentRecord::new(None, "Calle 1", "Choque", Vector::new(vec![1.0])))
            .unwrap();
        assert!(matches!(
            engine.find_similar("Calle 1").await,
            Err(Error::Embedding(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_embedding_times_out() {
        let engine = SimilarityEngine::new(
            Arc::new(SlowEmbedder),
            Arc::new(RecordingCompleter::default()),
            Arc::new(InMemoryAccidentRepository::new()),
            EngineConfig {
                call_timeout: Duration::from_secs(1),
                ..Default::default()
            },
        );
        engine
            .store()
            .append(AccidentRecord::new(None, "Calle 1", "Choque", Vector::new(vec![1.0; 8])))
            .unwrap();
        let err = engine.find_similar("Calle 1").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_, "embedding")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_embedding_on_ingestion_becomes_outcome() {
        let repository = Arc::new(InMemoryAccidentRepository::new());
        let engine = SimilarityEngine::new(
            Arc::new(SlowEmbedder),
            Arc::new(RecordingCompleter::default()),
            repository.clone(),
            EngineConfig {
                call_timeout: Duration::from_secs(1),
                ..Default::default()
            },
        );
        let outcome = engine
            .register_accident(report("Carrera 7", "Atropello", "15/04/2024"))
            .await;
        assert!(outcome.is_error);
        assert!(outcome.message.starts_with(MSG_NOT_INDEXED), "{}", outcome.message);
        assert!(engine.store().is_empty());
        assert_eq!(repository.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let h = harness();
        h.engine
            .store()
            .append(AccidentRecord::new(None, "Calle 1", "Choque", Vector::new(vec![1.0, 0.0])))
            .unwrap();
        let err = h.engine.find_similar("Calle 1").await.unwrap_err();
        assert!(matches!(err, Error::InvalidDimension { expected: 2, actual: 8 }));
    }
}
