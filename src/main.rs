mod company;
mod config;
mod employees;
mod enrich;
mod export;
mod filter;
mod markdown;
mod pipeline;
mod rank;
mod scraper;
mod sources;
mod titles;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::config::Settings;
use crate::pipeline::{RunOptions, Summary};
use crate::scraper::PageFetcher;
use crate::sources::directory::DirectorySource;
use crate::sources::sample::SampleSource;
use crate::sources::search::SearchSource;
use crate::sources::SourceKind;
use crate::titles::{SpiderTitleExtractor, TitleLookup};

#[derive(Parser)]
#[command(name = "lead_scraper", about = "Collect, enrich and rank company leads")]
struct Cli {
    /// Settings file (default: ./leads.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect, filter, enrich and rank companies, then export CSV
    Run {
        #[arg(short, long, value_enum, default_value = "search")]
        source: SourceKind,
        /// Industry to collect (repeatable; default from settings)
        #[arg(short, long = "industry")]
        industries: Vec<String>,
        /// Total companies to request, split across industries
        #[arg(short = 'n', long)]
        max_companies: Option<usize>,
        /// Skip pre-scraping filters
        #[arg(long)]
        no_filter: bool,
        /// Skip relevance ranking
        #[arg(long)]
        no_rank: bool,
        /// CSV file name inside the results directory
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the effective settings (API keys masked)
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&settings.masked())?);
            Ok(())
        }
        Commands::Run {
            source,
            industries,
            max_companies,
            no_filter,
            no_rank,
            output,
        } => {
            let selected = if industries.is_empty() { &settings.industries } else { &industries };
            let industries: Vec<String> = selected
                .iter()
                .map(|i| i.trim().to_lowercase())
                .filter(|i| !i.is_empty())
                .collect();
            settings.validate(source, &industries)?;

            let opts = RunOptions {
                industries,
                max_companies: max_companies.unwrap_or(settings.max_companies),
                apply_filters: !no_filter,
                apply_ranking: !no_rank,
            };
            let lookup = Arc::new(title_lookup(&settings)?);

            println!(
                "Generating up to {} leads for {} via {:?}...",
                opts.max_companies,
                opts.industries.join(", "),
                source
            );
            let (leads, counts) = match source {
                SourceKind::Search => {
                    let key = settings.serpapi_key.as_deref().unwrap_or_default();
                    let src = SearchSource::new(key, settings.timeout())?;
                    pipeline::run(&src, lookup, &settings, &opts).await
                }
                SourceKind::Directory => {
                    let key = settings.spider_api_key.as_deref().unwrap_or_default();
                    let src = DirectorySource::new(
                        PageFetcher::new(key, settings.timeout())?,
                        &settings.directory_url,
                        settings.max_pages_per_search,
                        settings.pacing(),
                    );
                    pipeline::run(&src, lookup, &settings, &opts).await
                }
                SourceKind::Sample => pipeline::run(&SampleSource, lookup, &settings, &opts).await,
            };

            println!(
                "Pipeline: {} collected, {} after filters, {} enrichment errors",
                counts.collected, counts.filtered, counts.enrich_errors
            );
            if leads.is_empty() {
                println!("No leads generated. Try different industries or a larger --max-companies.");
                return Ok(());
            }

            let path = export::export_to_csv(&leads, &settings.results_dir, output.as_deref())
                .context("Failed to export results")?;
            println!("\nSaved {} leads to {}", leads.len(), path.display());
            Summary::from_leads(&leads, counts.ranked).print();

            let elapsed = t0.elapsed();
            if elapsed.as_secs() >= 1 {
                println!("\nDone in {}", format_duration(elapsed));
            }
            Ok(())
        }
    }
}

fn title_lookup(settings: &Settings) -> anyhow::Result<TitleLookup> {
    match settings.spider_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => {
            let fetcher = PageFetcher::new(key, settings.timeout())?;
            Ok(TitleLookup::Spider(SpiderTitleExtractor::new(fetcher, settings.pacing())))
        }
        None => {
            warn!("No spider_api_key configured; job titles will be placeholders");
            Ok(TitleLookup::Offline)
        }
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
