//! # Forms LTS
//!
//! Incremental copy of form submissions from the primary database into a
//! long term storage (LTS) archive, with personal data redacted on the way.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌─────────────┐
//! │  Primary    │──▶│  Locate + Redact │──▶│  LTS        │
//! │  SQLite     │   │  (forms-lts-core)│   │  SQLite     │
//! └─────┬───────┘   └──────────────────┘   └─────────────┘
//!       │ key_value: watermark, window start
//!       ▼
//!   ┌──────────┐
//!   │ CLI (lts)│
//!   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lts init              # create both schemas
//! lts run               # copy until the backlog is drained
//! lts status            # watermark, backlog, archive size
//! lts get 42            # archived copy of submission 42
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connections |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementations of the core store traits |
//! | [`copy_cmd`] | `lts copy` and `lts run` |
//! | [`get`] | `lts get` and `lts notes` |
//! | [`list`] | `lts list` |
//! | [`status`] | `lts status` |
//!
//! The pipeline itself lives in [`forms_lts_core`], re-exported as [`core`].

pub mod config;
pub mod copy_cmd;
pub mod db;
pub mod get;
pub mod list;
pub mod migrate;
pub mod sqlite_store;
pub mod status;

pub use forms_lts_core as core;
