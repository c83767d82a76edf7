//! Collaborator seams for the enrichment engine.
//!
//! The engine consumes these through `Arc<dyn ...>` handles so every
//! network-backed capability can be swapped for a fake in tests.

pub mod extractor;
pub mod fetcher;
pub mod llm;
pub mod searcher;
pub mod store;
