//! # docsift
//!
//! Document search with snippets and highlighting over uploaded files.
//!
//! The search engine itself lives in the `docsift-core` crate and runs on
//! the [`DocumentStore`](docsift_core::store::DocumentStore) and
//! [`BlobStore`](docsift_core::store::BlobStore) traits. This crate
//! supplies the backends (SQLite, local or signed-HTTP blob storage), the
//! upload pipeline, a CLI and an HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Upload  │──▶│ Blob storage │   │    SQLite    │
//! │ (retry)  │──▶│ local / http │   │  documents   │
//! └──────────┘   └──────┬───────┘   └──────┬───────┘
//!                       │  hydrate         │  corpus
//!                       ▼                  ▼
//!                 ┌─────────────────────────────┐
//!                 │  docsift-core: filter, rank │
//!                 │  snippet, highlight         │
//!                 └──────────┬──────────────────┘
//!                    ┌───────┴───────┐
//!                    ▼               ▼
//!               ┌─────────┐     ┌─────────┐
//!               │   CLI   │     │  HTTP   │
//!               └─────────┘     └─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docsift init                          # create database
//! docsift upload ./contracts            # upload a directory
//! docsift import extracted.json         # load extracted text
//! docsift search "payment" --mode starts-with
//! docsift serve                         # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `DocumentStore` |
//! | [`blob`] | Local and signed-HTTP `BlobStore`s |
//! | [`backends`] | Opens both stores from config |
//! | [`upload`] | Upload sessions with retries and events |
//! | [`progress`] | Upload progress reporters |
//! | [`search`] | `search` / `suggest` commands |
//! | [`get`] | `get` / `list` / `delete` commands |
//! | [`import`] | Load extracted records from JSON |
//! | [`server`] | HTTP API |

pub mod backends;
pub mod blob;
pub mod config;
pub mod db;
pub mod get;
pub mod import;
pub mod migrate;
pub mod progress;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod upload;
