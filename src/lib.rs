//! # query-router
//!
//! An intelligent request-routing core: it classifies incoming
//! natural-language queries and dispatches each to one of three
//! downstream processing backends, backed by a two-tier routing cache
//! and a nine-stage adaptive quality pipeline.
//!
//! ## Core subsystems
//!
//! - **Classification & selection** — [`fingerprint`], [`features`],
//!   [`complexity`], [`category`], and [`selector`] together turn a raw
//!   query into a [`types::Classification`] and a chosen
//!   [`types::Backend`].
//! - **Routing cache** — [`cache`] implements the two-tier (exact-hash,
//!   embedding-similarity) TTL cache described by the `CacheStore`
//!   collaborator contract in [`collaborators`].
//! - **Adaptive pipeline** — [`stage`] and [`pipeline`] implement the
//!   nine fixed stages, their fatal/non-fatal policy, and the single
//!   stage-3 fallback retry; [`quality`] holds the in-core retrieval,
//!   grounding, and output-validation checks those stages apply.
//! - **Decision log & feedback** — [`decision_log`] and [`feedback`]
//!   record every routing decision and fold caller feedback back into
//!   the cache and the selector's performance records.
//! - **Batch dispatch** — [`batch`] fans many queries through the above
//!   concurrently with bounded parallelism.
//!
//! [`router::Router`] is the top-level entry point wiring all of the
//! above together behind the `route`/`route_batch`/`classify` API.

pub mod batch;
pub mod cache;
pub mod category;
pub mod collaborators;
pub mod complexity;
pub mod config;
pub mod decision_log;
pub mod error;
pub mod feedback;
pub mod features;
pub mod fingerprint;
pub mod pipeline;
pub mod quality;
pub mod router;
pub mod selector;
pub mod stage;
pub mod types;

pub use config::RouterConfig;
pub use error::{Result, RouterError};
pub use router::{ClassifyOutput, RouteOptions, Router};
pub use types::{Backend, Category, Classification, Complexity, Confidence, Feature, PipelineResult, RoutingDecision};
