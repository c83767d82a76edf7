//! Keyword heuristic for error pages that answer 200.

use crate::html;
use crate::types::config::LivenessConfig;

/// Looks for error wording in the title and first heading, and for
/// error-container class names.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    error_keywords: Vec<String>,
    class_keywords: Vec<String>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::from_config(&LivenessConfig::default())
    }
}

impl KeywordClassifier {
    pub fn from_config(config: &LivenessConfig) -> Self {
        Self {
            error_keywords: lowercase(&config.error_keywords),
            class_keywords: lowercase(&config.error_class_keywords),
        }
    }

    /// True when the HTML looks like an error page.
    pub fn is_error_page(&self, page_html: &str) -> bool {
        let mentions_error = |text: Option<String>| {
            text.map(|t| t.to_lowercase())
                .is_some_and(|t| self.error_keywords.iter().any(|k| t.contains(k.as_str())))
        };

        if mentions_error(html::extract_title(page_html)) {
            return true;
        }
        if mentions_error(html::first_heading(page_html)) {
            return true;
        }

        html::class_attributes(page_html).iter().any(|class| {
            let class = class.to_lowercase();
            self.class_keywords.iter().any(|k| class.contains(k.as_str()))
        })
    }
}

fn lowercase(words: &[String]) -> Vec<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}
