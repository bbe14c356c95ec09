//! # docsift core
//!
//! Runtime-agnostic search logic for docsift: document models, sentence
//! segmentation, match predicates, snippet location, fuzzy ranking, HTML
//! highlighting, the search orchestrator, and the store traits it runs on.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Records, match modes, field scopes, results |
//! | [`segment`] | Sentence and word spans |
//! | [`matcher`] | contains / startsWith / endsWith predicates |
//! | [`locate`] | First match + snippet window |
//! | [`rank`] | Weighted fuzzy re-ranking |
//! | [`highlight`] | Escaped HTML highlight markup |
//! | [`search`] | `search` and `suggest` orchestration |
//! | [`store`] | `DocumentStore` / `BlobStore` traits, in-memory backends |

pub mod highlight;
pub mod locate;
pub mod matcher;
pub mod models;
pub mod rank;
pub mod search;
pub mod segment;
pub mod store;
