//! # API Harness Core
//!
//! Shared, I/O-free logic for API Harness: endpoint data models, registry
//! snapshots, the fuzzy search engine, the endpoint index builder, and the
//! read-side query logic (source listing, pagination, search).
//!
//! This crate contains no tokio, network, or filesystem dependencies. The
//! application crate fetches and parses documents, owns the refresh
//! lifecycle, and hands finished [`snapshot::RegistrySnapshot`]s to
//! [`state::PublishedState::build`].

pub mod fuzzy;
pub mod index;
pub mod models;
pub mod pagination;
pub mod query;
pub mod snapshot;
pub mod state;
