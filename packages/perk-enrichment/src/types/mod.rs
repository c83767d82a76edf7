//! Data types for records, pages, decisions and configuration.

pub mod config;
pub mod decision;
pub mod page;
pub mod perk;
pub mod record;
