//! LLM prompts for field extraction, crawl decisions, page judgement and
//! search-grounded lookups.
//!
//! Templates use `{name}` placeholders. Untrusted text (page content,
//! gathered JSON) is substituted last so it cannot inject placeholders.

/// Prompt for extracting the four perk fields from page text.
pub const EXTRACT_FIELDS_PROMPT: &str = r#"You are an information extraction assistant.

Given the text below, extract the following fields:

- "Provider Description": A very brief (1-2 sentences) description of the company or organization offering the perk.
- "What You Get": Summarize clearly what the perk provides (discount, credits, service, etc.).
- "How To Get It": Instructions on how someone can claim or access the perk.
- "Money Value": The financial value of the perk (in USD or EUR if available). If no value is clear, return "Not found".

**Important rules**:
- Do not invent missing information.
- If a field cannot be found, respond exactly with "Not found".
- Output only valid JSON, no commentary.

Text to analyze:
"""
{text}
"""

Respond in this exact JSON format:
{
    "Brief description of the provider": "",
    "What you get": "",
    "How to get it": "",
    "Value": ""
}"#;

/// System message for the crawl decision maker.
pub const DECIDE_SYSTEM_PROMPT: &str = r#"Analyze the currently gathered perk information, the original description (if available), and the content of the last scraped page.
Decide the next best action: scrape relevant links further, perform a web search for more/recent info, aggregate the findings, or stop if enough info is gathered or depth limit is reached.
Consider the relevance of extracted links. Only suggest scraping URLs highly likely to contain specific perk details (avoid generic links like 'contact us', 'blog', 'careers').
Respond with a single JSON object matching this schema, no commentary:
{schema}"#;

/// User message for the crawl decision maker.
pub const DECIDE_PROMPT: &str = r#"Perk: {name}

Original Perk Description (from database): {original_description}

Information Gathered So Far:
{gathered_info_json}

Links found on the last page:
{links}

Content from last scraped URL ({last_url}):
```markdown
{last_content}
```

Based on this, what is the next step? Current depth: {depth}/{max_depth}. Web search performed: {search_performed}.
Allowed actions: "scrape_further" (fill relevant_urls_to_scrape), "search_web" (fill search_query, only if no search was performed), "aggregate", "stop"."#;

/// Prompt for judging whether a page that answered 200 is really usable.
pub const CLASSIFY_PAGE_PROMPT: &str = r#"You check whether a web page is really available.

Answer YES if the page is either:
(a) an error page despite loading normally (for example "404", "page not found", "this page does not exist", "something went wrong"), or
(b) a form, application or program that is explicitly closed (for example "no longer accepting responses", "applications are closed", "program is on pause", "this offer has ended").

Answer NO otherwise.

Answer with exactly one word: YES or NO.

Page text:
"""
{text}
"""
"#;

/// System message for the search-grounded lookup.
pub const SEARCH_SYSTEM_PROMPT: &str = "You are a research assistant that finds detailed, \
factual information about startup perks, discounts, and special offers. Always answer in \
pure JSON (no markdown or commentary), and keep each field to 1-2 sentences maximum.";

/// User message for the search-grounded lookup.
pub const SEARCH_PROMPT: &str = r#"Search online for the most current, factual information about the following:
"{query}"

Respond in this exact JSON format:
{
    "Brief description of the provider": "",
    "What you get": "",
    "How to get it": "",
    "Value": ""
}
Rules:
- Use 1-2 sentences per field.
- Do not invent missing information; if you can not find a field, use "Not found".
- Return only valid JSON, no commentary, no code blocks, no explanations.
- The "Value" field must be a monetary value the startup gets, not text."#;

/// Format the extraction prompt.
pub fn format_extract_prompt(text: &str) -> String {
    EXTRACT_FIELDS_PROMPT.replace("{text}", text)
}

/// Format the decision system message with the response schema.
pub fn format_decide_system_prompt(schema: &str) -> String {
    DECIDE_SYSTEM_PROMPT.replace("{schema}", schema)
}

/// Inputs for [`format_decide_prompt`].
pub struct DecidePromptArgs<'a> {
    pub name: &'a str,
    pub original_description: &'a str,
    pub gathered_info_json: &'a str,
    pub links: &'a [String],
    pub last_url: &'a str,
    pub last_content: &'a str,
    pub depth: usize,
    pub max_depth: usize,
    pub search_performed: bool,
}

/// Format the decision prompt.
pub fn format_decide_prompt(args: &DecidePromptArgs<'_>) -> String {
    let links = if args.links.is_empty() {
        "(none)".to_string()
    } else {
        args.links
            .iter()
            .map(|l| format!("- {}", l))
            .collect::<Vec<_>>()
            .join("\n")
    };

    DECIDE_PROMPT
        .replace("{depth}", &args.depth.to_string())
        .replace("{max_depth}", &args.max_depth.to_string())
        .replace("{search_performed}", &args.search_performed.to_string())
        .replace("{last_url}", args.last_url)
        .replace("{name}", args.name)
        .replace("{original_description}", args.original_description)
        .replace("{links}", &links)
        .replace("{gathered_info_json}", args.gathered_info_json)
        .replace("{last_content}", args.last_content)
}

/// Format the page judgement prompt.
pub fn format_classify_page_prompt(text: &str) -> String {
    CLASSIFY_PAGE_PROMPT.replace("{text}", text)
}

/// Format the search-grounded lookup prompt.
pub fn format_search_prompt(query: &str) -> String {
    SEARCH_PROMPT.replace("{query}", query)
}
