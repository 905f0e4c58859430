use std::path::PathBuf;
use std::process;

use cdc_bulletin::extract::{ExtractorConfig, ScanOrder, first_statistics};
use cdc_bulletin::scraper::{BulletinPage, PageSource, WebScraper};
use cdc_bulletin::sink::{DEFAULT_OUTPUT, JsonFileSink};
use cdc_bulletin::types::BulletinReference;
use cdc_bulletin::utils::RunSummary;
use cdc_bulletin::{FailurePolicy, StatsPipeline};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "cdc-bulletin")]
#[command(about = "A China CDC bulletin positivity statistics extractor", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        long,
        default_value = cdc_bulletin::LIST_URL,
        global = true,
        help = "URL of the bulletin list page"
    )]
    list_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Order {
    Backward,
    Forward,
}

impl From<Order> for ScanOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Backward => ScanOrder::Backward,
            Order::Forward => ScanOrder::Forward,
        }
    }
}

#[derive(Debug, Args)]
struct ScanArgs {
    #[arg(
        long,
        value_enum,
        default_value = "backward",
        help = "Order in which clauses before the anchor are searched"
    )]
    before_order: Order,

    #[arg(
        long,
        value_enum,
        default_value = "backward",
        help = "Order in which clauses after the anchor are searched"
    )]
    after_order: Order,

    #[arg(
        long,
        help = "Only search this many clauses nearest the anchor on each side",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    window: Option<u32>,
}

impl From<ScanArgs> for ExtractorConfig {
    fn from(args: ScanArgs) -> Self {
        ExtractorConfig {
            before_order: args.before_order.into(),
            after_order: args.after_order.into(),
            window: args.window.map(|w| w as usize),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the bulletins published on the list page
    List {
        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Extract the statistics of a single bulletin page
    Extract {
        #[arg(help = "URL of the bulletin page")]
        url: String,

        #[command(flatten)]
        scan: ScanArgs,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Extract statistics from every listed bulletin and write them to a file
    Run {
        #[arg(
            long,
            help = "Maximum number of bulletins to process",
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        limit: Option<u32>,

        #[command(flatten)]
        scan: ScanArgs,

        #[arg(short = 'f', long, default_value = DEFAULT_OUTPUT, help = "Output file")]
        file: PathBuf,

        #[arg(long, help = "Record malformed bulletins without data instead of aborting")]
        keep_going: bool,
    },
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

async fn fetch_listing(scraper: &WebScraper, list_url: &str) -> Vec<BulletinReference> {
    scraper.list_bulletins(list_url).await.unwrap_or_else(|e| {
        log::error!("Error fetching bulletin list: {}", e);
        process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let scraper = WebScraper::new().unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });

    match cli.command {
        Commands::List { format } => {
            let posts = fetch_listing(&scraper, &cli.list_url).await;

            match format {
                OutputFormat::Json => serialize_json(&posts),
                OutputFormat::Text => {
                    if posts.is_empty() {
                        println!("No entries to display.");
                    } else {
                        for (i, post) in posts.iter().enumerate() {
                            println!("{:>3}. {}", i + 1, post);
                        }
                    }
                }
            }
        }

        Commands::Extract { url, scan, format } => {
            log::info!("Fetching bulletin from {}...", url);

            let config = ExtractorConfig::from(scan);
            let outcome = {
                let page = scraper.open_page(&url).await.unwrap_or_else(|e| {
                    log::error!("Error fetching bulletin: {}", e);
                    process::exit(1);
                });

                first_statistics(page.paragraphs(), &config).unwrap_or_else(|e| {
                    log::error!("Malformed bulletin {url}: {e}");
                    process::exit(1);
                })
            };

            match (outcome, format) {
                (Some(result), OutputFormat::Json) => serialize_json(&result),
                (Some(result), OutputFormat::Text) => println!("{}", result),
                (None, format) => {
                    log::warn!("No count found for {url}");
                    if matches!(format, OutputFormat::Json) {
                        println!("null");
                    }
                }
            }
        }

        Commands::Run {
            limit,
            scan,
            file,
            keep_going,
        } => {
            let mut posts = fetch_listing(&scraper, &cli.list_url).await;
            if let Some(limit) = limit {
                posts.truncate(limit as usize);
            }

            let policy = if keep_going {
                FailurePolicy::Skip
            } else {
                FailurePolicy::Abort
            };
            let pipeline = StatsPipeline::new(scraper, scan.into()).with_policy(policy);
            let sink = JsonFileSink::new(file);

            let records = pipeline.run_into(posts, &sink).await.unwrap_or_else(|e| {
                log::error!("Run failed: {}", e);
                process::exit(1);
            });

            for (i, record) in records.iter().enumerate() {
                println!("{:>3}. {}", i + 1, record);
            }
            print!("{}", RunSummary::from_records(&records));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_must_be_positive() {
        let parsed = Cli::try_parse_from(["cdc-bulletin", "extract", "https://example.test/a.html", "--window", "0"]);
        assert!(parsed.is_err());

        let cli = Cli::try_parse_from(["cdc-bulletin", "extract", "https://example.test/a.html", "--window", "2"])
            .expect("Failed to parse args");
        match cli.command {
            Commands::Extract { scan, .. } => {
                assert_eq!(ExtractorConfig::from(scan).window, Some(2));
            }
            _ => panic!("Expected extract command"),
        }
    }

    #[test]
    fn test_run_limit_must_be_positive() {
        assert!(Cli::try_parse_from(["cdc-bulletin", "run", "--limit", "0"]).is_err());
        assert!(Cli::try_parse_from(["cdc-bulletin", "run", "--limit", "3"]).is_ok());
    }
}
