//! Web searcher trait for gap filling.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::page::SearchHit;

/// Web search returning ranked hits.
///
/// # Implementations
///
/// - `PerplexitySearcher` - search-grounded LLM answer plus citations
/// - `ExaSearcher` - Exa API with page text
/// - `MockSearcher` - For testing
#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Join hits into one text block for extraction.
pub fn hits_to_text(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| match &hit.source_url {
            Some(url) => format!("{}\n(Source: {})", hit.text.trim(), url),
            None => hit.text.trim().to_string(),
        })
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_to_text() {
        let hits = vec![
            SearchHit::new("Acme gives $500 credits").with_source("https://acme.example/perks"),
            SearchHit::new("   "),
            SearchHit::new("Apply via the portal"),
        ];
        let text = hits_to_text(&hits);
        assert_eq!(
            text,
            "Acme gives $500 credits\n(Source: https://acme.example/perks)\n\nApply via the portal"
        );
    }

    #[test]
    fn test_hits_to_text_empty() {
        assert_eq!(hits_to_text(&[]), "");
    }
}
