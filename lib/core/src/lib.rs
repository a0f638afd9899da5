//! # vialert Core
//!
//! Core library for the vialert accident similarity service.
//!
//! This crate provides the fundamental data structures and algorithms:
//!
//! - [`Vector`] - Dense embedding vector with cosine similarity
//! - [`AccidentRecord`] - An accident with its description embedding
//! - [`RecordStore`] - Append-only in-memory working set of records
//! - [`top_k`] - Bounded min-heap selection of the best scored items
//!
//! ## Example
//!
//! ```rust
//! use vialert_core::{AccidentRecord, RecordStore, Vector, top_k};
//!
//! let store = RecordStore::new();
//! store.append(AccidentRecord::new(
//!     Some("10/03/2024".to_string()),
//!     "Calle 80",
//!     "Choque",
//!     Vector::new(vec![1.0, 0.0, 0.0]),
//! )).unwrap();
//!
//! let query = Vector::new(vec![1.0, 0.0, 0.0]);
//! let ranked: Vec<(AccidentRecord, f32)> = store.with_records(|records| {
//!     top_k(records.iter(), 10, |r| {
//!         r.embedding.as_ref().map(|e| e.cosine_similarity(&query)).unwrap_or(0.0)
//!     })
//!     .into_iter()
//!     .map(|(r, score)| (r.stripped(), score))
//!     .collect()
//! });
//! assert_eq!(ranked.len(), 1);
//! assert!(ranked[0].0.embedding.is_none());
//! ```

pub mod date;
pub mod error;
pub mod record;
pub mod store;
pub mod topk;
pub mod vector;

pub use date::{format_report_date, parse_report_date, REPORT_DATE_FORMAT};
pub use error::{Error, Result};
pub use record::{AccidentRecord, UNKNOWN_DATE};
pub use store::RecordStore;
pub use topk::top_k;
pub use vector::Vector;
