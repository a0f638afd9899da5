//! # vialert
//!
//! Finds historical traffic accidents similar to a street address and turns
//! them into a road safety alert.
//!
//! Accident descriptions are embedded once at startup and kept in an
//! in-memory store. A query embeds the address, ranks every stored record by
//! cosine similarity and keeps the ten best. Newly reported accidents are
//! persisted, embedded and merged into the store without duplicates.
//!
//! ## Quick Start
//!
//! ```bash
//! OPENAI_API_KEY=... vialert --dataset ./data/dataset.csv --http-port 8080
//! curl 'http://localhost:8080/accidentes/similares?direccion=Calle%2080'
//! curl 'http://localhost:8080/accidentes/alerta?direccion=Calle%2080'
//! ```
//!
//! ## Crate Structure
//!
//! - `vialert-core` - Records, vectors, the record store and top-K ranking
//! - `vialert-storage` - Dataset loading and the accident repository
//! - `vialert-similarity` - The similarity engine and model clients
//! - `vialert-api` - REST API

pub use vialert_core::{
    parse_report_date, top_k, AccidentRecord, Error, RecordStore, Result, Vector,
};

pub use vialert_storage::{
    AccidentRepository, DatasetLoader, DatasetRow, InMemoryAccidentRepository,
    LmdbAccidentRepository,
};

pub use vialert_similarity::{
    AccidentReport, CompletionClient, CompletionOptions, EmbeddingClient, EngineConfig,
    IngestOutcome, SimilarityEngine,
};

pub use vialert_api::RestApi;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AccidentRecord, AccidentReport, CompletionClient, EmbeddingClient, EngineConfig, Error,
        IngestOutcome, RecordStore, Result, SimilarityEngine, Vector,
    };
}
