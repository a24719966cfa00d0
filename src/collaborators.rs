//! Collaborator contracts.
//!
//! Every external system the core depends on — embedding generation,
//! retrieval, generation, LLM-assisted classification, and the three
//! backing stores — is modeled as an object-safe `async_trait`, the way
//! `dashflow_chains`'s `Retriever`/`LLM` traits and
//! `dashflow_registry::cache::CacheStore` are defined. None of these are
//! implemented here beyond in-memory reference stores; production
//! deployments inject their own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{CacheEntry, Classification, PerformanceRecord, RoutingDecision, TaskType, WorkerId};

/// Produces a fixed-length embedding for a piece of text. Out of scope to
/// implement; failures are always non-fatal to the caller.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Retrieves candidate passages for a query given retrieval parameters.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(
        &self,
        query: &str,
        params: &crate::types::RetrievalParams,
    ) -> Result<RetrievedDocuments>;
}

/// The documents and per-document relevance scores returned by a
/// [`Retriever`].
#[derive(Debug, Clone)]
pub struct RetrievedDocuments {
    pub documents: Vec<String>,
    pub scores: Vec<f64>,
}

/// Produces an answer from a query, its retrieved sources, the intent
/// classification, and the selected worker id.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        query: &str,
        sources: &[String],
        intent: &Classification,
        worker_id: &WorkerId,
    ) -> Result<String>;
}

/// An LLM-assisted classifier used in place of the deterministic rule
/// path when LLM mode is enabled. Returns an untrusted raw string that
/// the caller must structurally validate before use.
#[async_trait]
pub trait ClassifierLlm: Send + Sync {
    async fn classify(&self, query: &str, schema: &str) -> Result<String>;
}

/// Backing store for the two-tier routing cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_by_hash(&self, exact_hash: &str) -> Result<Option<CacheEntry>>;
    async fn get_by_similarity(
        &self,
        embedding: &[f32],
        threshold: f64,
    ) -> Result<Option<CacheEntry>>;
    async fn insert(&self, entry: CacheEntry) -> Result<()>;
    async fn increment_hit(&self, id: uuid::Uuid) -> Result<()>;
    async fn prune(&self, expired_only: bool, now: DateTime<Utc>) -> Result<u64>;
    async fn stats(&self) -> Result<CacheStats>;
}

/// Aggregate counters returned by [`CacheStore::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub total_entries: u64,
    pub total_hits: u64,
}

impl CacheStats {
    #[must_use]
    pub fn average_hits_per_entry(&self) -> f64 {
        if self.total_entries == 0 {
            0.0
        } else {
            self.total_hits as f64 / self.total_entries as f64
        }
    }
}

/// Backing store for the append-only decision log.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    async fn append(&self, decision: RoutingDecision, cache_entry_id: Option<uuid::Uuid>) -> Result<()>;
    async fn amend(&self, request_id: uuid::Uuid, patch: DecisionAmendment) -> Result<bool>;
    async fn query(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<LoggedDecision>>;
    /// Fetch a single logged decision by `request_id`, used by the
    /// feedback integrator to recover the original decision's selected
    /// worker and measured quality/latency.
    async fn get(&self, request_id: uuid::Uuid) -> Result<Option<LoggedDecision>>;
}

/// Mutable fields a [`crate::types::Feedback`] submission may amend.
#[derive(Debug, Clone, Default)]
pub struct DecisionAmendment {
    pub verdict: Option<crate::types::Verdict>,
    pub comment: Option<String>,
    pub corrected_backend: Option<crate::types::Backend>,
}

/// A decision-log row, as returned by [`DecisionStore::query`].
#[derive(Debug, Clone)]
pub struct LoggedDecision {
    pub decision: RoutingDecision,
    pub cache_entry_id: Option<uuid::Uuid>,
    pub amendment: DecisionAmendment,
}

/// Backing store for per-`(worker, task_type)` performance records.
#[async_trait]
pub trait PerfStore: Send + Sync {
    async fn get(&self, worker: &WorkerId, task: TaskType) -> Result<Option<PerformanceRecord>>;
    async fn record(
        &self,
        worker: &WorkerId,
        task: TaskType,
        success: bool,
        latency_ms: f64,
        quality: f64,
        now: DateTime<Utc>,
    ) -> Result<PerformanceRecord>;
}
