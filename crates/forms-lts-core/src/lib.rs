//! # Forms LTS Core
//!
//! Shared logic for copying form submissions into long term storage:
//! record model, PII redaction, store traits, change detection, and the
//! resumable copy pipeline.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Storage is
//! reached only through the traits in [`store`]; the in-memory
//! implementations in [`store::memory`] back the tests.
//!
//! ## Pipeline
//!
//! ```text
//! Watermark ──▶ SourceRecordLocator ──▶ load ──▶ RedactionEngine ──▶ ArchiveStore::resave
//!     ▲                                                                     │
//!     └──────────────────────── advance after the batch ◀───────────────────┘
//! ```
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | `Record`, `Element`, `RedactionResult`, `ArchiveEntry` |
//! | [`redact`] | Element classification, text scrubbing, record redaction |
//! | [`store`] | `RecordStore`, `SourceStore`, `ArchiveStore`, `KeyValueStore` |
//! | [`watermark`] | Persisted change-time cursor |
//! | [`locator`] | Finds the records the next batch copies |
//! | [`copy`] | One copy batch |
//! | [`batch`] | Page-by-page driver for scheduled runs |

pub mod batch;
pub mod copy;
pub mod locator;
pub mod models;
pub mod redact;
pub mod store;
pub mod watermark;
