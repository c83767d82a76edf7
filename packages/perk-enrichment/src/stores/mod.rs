//! Record store implementations.
//!
//! Available backends:
//! - `MemoryStore` - In-memory store (always available)
//! - `AirtableStore` - Airtable REST API (requires `airtable` feature)

pub mod memory;

#[cfg(feature = "airtable")]
pub mod airtable;

pub use memory::MemoryStore;

#[cfg(feature = "airtable")]
pub use airtable::AirtableStore;
