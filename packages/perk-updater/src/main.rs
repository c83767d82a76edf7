//! Perk table updater.
//!
//! Checks every perk link in the Airtable table, enriches live ones and
//! writes the results back, keeping a snapshot of each run on disk.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use perk_enrichment::{
    AirtableStore, BatchConfig, BatchRunner, BatchSummary, BrowserPageFetcher, BrowserlessClient,
    CrawlAndDecide, CrawlConfig, ExaSearcher, FallbackFetcher, FirecrawlFetcher, HttpPageFetcher,
    InputRecord, LivenessClassifier, LivenessConfig, LlmDecisionMaker, LlmFieldExtractor,
    LlmPageClassifier, MonetaryStrategy, OpenAiChat, PageFetcher, PerplexitySearcher,
    RateLimitedFetcher, ReqwestProbe, ServiceCredentials, Snapshot, SnapshotWriter, StatusPolicy,
    WebSearcher,
};

use crate::config::Config;

/// Crawl fetches per second.
const CRAWL_RATE: u32 = 2;

#[derive(Parser)]
#[command(name = "perk-updater", about = "Check and enrich perk records")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Compute everything, write nothing back
    #[arg(long, global = true)]
    dry_run: bool,

    /// Process at most this many records
    #[arg(long, global = true)]
    limit: Option<usize>,

    /// Pages followed beyond the first
    #[arg(long, global = true, default_value_t = 3)]
    max_depth: usize,

    /// Pause between records
    #[arg(long, global = true, default_value_t = 1000)]
    delay_ms: u64,

    #[arg(long, global = true, default_value = "results")]
    results_dir: PathBuf,

    /// Previous scraped_info.json; its records are not redone
    #[arg(long, global = true)]
    resume: Option<PathBuf>,

    /// Do not re-check records already marked broken
    #[arg(long, global = true)]
    skip_broken: bool,

    /// Leave the status of unreachable records untouched
    #[arg(long, global = true)]
    keep_unknown: bool,

    /// Write Value as a plain number
    #[arg(long, global = true)]
    numeric_value: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Update the status column only
    Status,
    /// Update status and enrich live records
    Enrich,
    /// Classify one link
    Classify { url: String },
    /// Crawl one link and print the merged fields
    Crawl { url: String },
}

impl Cli {
    fn monetary_strategy(&self) -> MonetaryStrategy {
        if self.numeric_value {
            MonetaryStrategy::Numeric
        } else {
            MonetaryStrategy::PreferCurrency
        }
    }

    fn batch_config(&self, config: &Config, enrich: bool) -> BatchConfig {
        let mut batch = BatchConfig::default()
            .with_delay_ms(self.delay_ms)
            .with_enrich(enrich)
            .with_dry_run(self.dry_run)
            .with_skip_broken(self.skip_broken)
            .with_status_policy(StatusPolicy {
                unknown_as_broken: !self.keep_unknown,
            })
            .with_monetary_strategy(self.monetary_strategy());
        if let Some(limit) = self.limit {
            batch = batch.with_limit(limit);
        }
        if let Some(field) = &config.airtable_last_edited_field {
            batch = batch.with_last_edited_field(field);
        }
        batch
    }
}

/// Clients shared by every command.
struct Services {
    llm: OpenAiChat,
    browser: Option<Arc<BrowserlessClient>>,
}

impl Services {
    fn new(config: &Config) -> Result<Self> {
        let mut credentials = ServiceCredentials::new(&config.openai_api_key);
        if let Some(url) = &config.openai_base_url {
            credentials = credentials.with_base_url(url);
        }
        let llm = OpenAiChat::new(credentials)
            .context("Failed to create OpenAI client")?
            .with_model(&config.openai_model);

        let browser = match &config.browserless_url {
            Some(url) => {
                let mut client = BrowserlessClient::new(url).context("Failed to create Browserless client")?;
                if let Some(token) = &config.browserless_token {
                    client = client.with_token(token.as_str());
                }
                Some(Arc::new(client))
            }
            None => None,
        };

        Ok(Self { llm, browser })
    }

    fn liveness(&self) -> Result<LivenessClassifier> {
        let liveness_config = LivenessConfig::default();
        let probe = ReqwestProbe::new(&liveness_config).context("Failed to create HTTP probe")?;

        let mut classifier = LivenessClassifier::new(Arc::new(probe), &liveness_config)
            .with_page_classifier(Arc::new(LlmPageClassifier::new(self.llm.clone())));
        if let Some(browser) = &self.browser {
            classifier = classifier.with_browser(browser.clone());
        }
        Ok(classifier)
    }

    fn crawler(&self, config: &Config, cli: &Cli) -> Result<CrawlAndDecide> {
        let http = HttpPageFetcher::new().context("Failed to create HTTP fetcher")?;

        // Firecrawl is preferred over the browser for pages plain HTTP cannot read
        let secondary: Option<Arc<dyn PageFetcher>> = match (&config.firecrawl_api_key, &self.browser) {
            (Some(key), _) => {
                let firecrawl = FirecrawlFetcher::new(ServiceCredentials::new(key))
                    .context("Failed to create Firecrawl client")?;
                Some(Arc::new(firecrawl) as Arc<dyn PageFetcher>)
            }
            (None, Some(browser)) => Some(Arc::new(BrowserPageFetcher::new(browser.clone())) as Arc<dyn PageFetcher>),
            (None, None) => None,
        };
        let fetcher: Arc<dyn PageFetcher> = match secondary {
            Some(secondary) => Arc::new(FallbackFetcher::new(http, secondary)),
            None => Arc::new(http),
        };

        let mut crawler = CrawlAndDecide::new(
            Arc::new(RateLimitedFetcher::new(fetcher, CRAWL_RATE)),
            Arc::new(LlmFieldExtractor::new(self.llm.clone())),
            Arc::new(LlmDecisionMaker::new(self.llm.clone())),
        )
        .with_config(CrawlConfig::default().with_max_depth(cli.max_depth))
        .with_monetary_strategy(cli.monetary_strategy());

        if let Some(searcher) = searcher(config)? {
            crawler = crawler.with_searcher(searcher);
        }
        Ok(crawler)
    }
}

/// Perplexity when configured, else Exa, else no search.
fn searcher(config: &Config) -> Result<Option<Arc<dyn WebSearcher>>> {
    if let Some(key) = &config.perplexity_api_key {
        let searcher: Arc<dyn WebSearcher> = Arc::new(
            PerplexitySearcher::new(ServiceCredentials::new(key)).context("Failed to create Perplexity client")?,
        );
        return Ok(Some(searcher));
    }
    if let Some(key) = &config.exa_api_key {
        let searcher: Arc<dyn WebSearcher> =
            Arc::new(ExaSearcher::new(ServiceCredentials::new(key)).context("Failed to create Exa client")?);
        return Ok(Some(searcher));
    }
    tracing::info!("No search API key configured, web search disabled");
    Ok(None)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,perk_enrichment=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let services = Services::new(&config)?;

    match &cli.command {
        Command::Status => run_batch(&cli, &config, &services, false).await,
        Command::Enrich => run_batch(&cli, &config, &services, true).await,
        Command::Classify { url } => {
            let verdict = services.liveness()?.classify(Some(url.as_str())).await;
            println!("{} {}", url.bold(), verdict);
            Ok(())
        }
        Command::Crawl { url } => {
            let crawler = services.crawler(&config, &cli)?;
            let outcome = crawler.run(&InputRecord::new("cli", url.as_str()).with_url(url)).await;
            println!("{}", serde_json::to_string_pretty(&outcome.merged)?);
            println!(
                "{} {:?}, visited {}",
                "Finished:".bright_cyan(),
                outcome.termination,
                outcome.visited.join(", ")
            );
            Ok(())
        }
    }
}

async fn run_batch(cli: &Cli, config: &Config, services: &Services, enrich: bool) -> Result<()> {
    let airtable = config.airtable()?;
    let store = AirtableStore::new(
        ServiceCredentials::new(airtable.api_key),
        airtable.base_id,
        airtable.table_id,
    )
    .context("Failed to create Airtable client")?;

    let previous = match &cli.resume {
        Some(path) => Some(
            Snapshot::load(path)
                .await
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?,
        ),
        None => None,
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing current record");
            on_signal.cancel();
        }
    });

    let mut runner = BatchRunner::new(Arc::new(store), services.liveness()?, cli.batch_config(config, enrich))
        .with_cancellation(cancel);
    if enrich {
        runner = runner.with_crawler(services.crawler(config, cli)?);
    }
    if let Some(previous) = &previous {
        runner = runner.with_completed(previous.completed_ids());
    }

    let report = runner.run().await.context("Batch run failed")?;

    let mut snapshot = Snapshot::from_report(&report);
    if let Some(previous) = previous {
        snapshot = snapshot.with_previous(previous);
    }
    let dir = SnapshotWriter::new(&cli.results_dir)
        .write(&snapshot)
        .await
        .context("Failed to write snapshot")?;

    print_summary(&report.summary, report.cancelled, cli.dry_run);
    println!("{} {}", "Results:".bright_cyan().bold(), dir.display());
    Ok(())
}

fn print_summary(summary: &BatchSummary, cancelled: bool, dry_run: bool) {
    println!();
    println!("{}", "Run summary".bright_cyan().bold());
    if cancelled {
        println!("{}", "Interrupted before the end of the table".yellow());
    }
    if dry_run {
        println!("{}", "Dry run, nothing was written".yellow());
    }

    print_group("No link", &summary.no_link, |s| s.normal());
    print_group("Active", &summary.active, |s| s.green());
    print_group("Inactive", &summary.inactive, |s| s.red());
    print_group("Updated", &summary.updated, |s| s.bright_blue());
    print_group("Failed updates", &summary.failed_updates, |s| s.bright_red());

    println!("{} {}", "Processed:".bold(), summary.processed());
}

fn print_group(title: &str, names: &[String], paint: impl Fn(&str) -> colored::ColoredString) {
    println!("{} {}", paint(title).bold(), format!("({})", names.len()).as_str().dimmed());
    for name in names {
        println!("  {}", name);
    }
}
