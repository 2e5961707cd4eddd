//! # DocQA — Retrieval-Grounded Enterprise Document Q&A
//!
//! Answers employee questions from a corpus of internal documents by
//! retrieving relevant chunks from a managed search index and asking a
//! language model to answer strictly from that retrieved context.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading, validation, env overrides
//! - **[`chunker`]** — Overlapping word-window chunking for indexing
//! - **[`safety`]** — Question gate, answer sanitizer, groundedness heuristic
//! - **[`prompt`]** — Rule-constrained prompt template
//! - **[`pipeline`]** — Safety gate → retrieve → prompt → generate → post-process
//! - **[`backend`]** — Retriever/Generator/Indexer seams + REST clients
//! - **[`documents`]** — Text extraction, validation, chunk preparation
//! - **[`server`]** — axum JSON API (`/api/ask`, `/api/stats`)
//! - **[`audit`]** — Q&A audit trail hook

pub mod audit;
pub mod backend;
pub mod chunker;
pub mod config;
pub mod documents;
pub mod pipeline;
pub mod prompt;
pub mod safety;
pub mod server;
