//! Reference model and search adapters.
//!
//! - `OpenAiChat` - OpenAI-compatible chat completions (OpenAI, Perplexity)
//! - `PerplexitySearcher` - search-grounded answers as search hits
//! - `ExaSearcher` - Exa search API (requires `exa` feature)

#[cfg(feature = "openai")]
mod openai;
#[cfg(feature = "openai")]
mod perplexity;

#[cfg(feature = "exa")]
mod exa;

#[cfg(feature = "openai")]
pub use openai::{OpenAiChat, OPENAI_API_URL, PERPLEXITY_API_URL, PERPLEXITY_MODEL};
#[cfg(feature = "openai")]
pub use perplexity::PerplexitySearcher;

#[cfg(feature = "exa")]
pub use exa::ExaSearcher;
