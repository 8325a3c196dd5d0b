//! postscrape CLI
//!
//! Local execution entry point. Scrape commands need a running chromedriver
//! (or any WebDriver server) at `browser.webdriver_url`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use postscrape::{
    error::{AppError, Result},
    models::{Config, PostRecord, TweetRecord},
    pipeline::{self, ScrapeKind},
    services::{Browser, WebDriverBrowser},
    storage::LocalStorage,
    utils::http,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// postscrape - Facebook and Twitter/X post metadata scraper
#[derive(Parser, Debug)]
#[command(
    name = "postscrape",
    version,
    about = "Scrape post text, engagement and author from Facebook and Twitter/X"
)]
struct Cli {
    /// Directory holding input and output CSV files
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Path to the TOML config (default: {data_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split Facebook URLs into video and post files
    Classify {
        /// Input CSV with `accounts,news_id`
        input: String,

        #[arg(long, default_value = "FB_vid_urls.csv")]
        videos: String,

        #[arg(long, default_value = "FB_post_urls.csv")]
        posts: String,
    },

    /// Recover Facebook post ids, resolving share links
    Ids {
        /// Input CSV with `accounts,news_id`
        input: String,

        #[arg(long, default_value = "FB_ids.csv")]
        output: String,

        /// Skip HTTP redirect resolution
        #[arg(long)]
        no_http: bool,

        /// Fall back to resolving in a browser tab
        #[arg(long)]
        browser: bool,
    },

    /// Scrape Facebook posts
    Posts(ScrapeArgs),

    /// Scrape Facebook reels and videos
    Reels(ScrapeArgs),

    /// Scrape tweets
    Tweets(ScrapeArgs),

    /// Merge chunk files `<prefix>_<n>.csv` into `all_<prefix>.csv`
    Merge {
        prefix: String,

        #[arg(long, value_enum, default_value_t = RecordKind::Posts)]
        kind: RecordKind,
    },

    /// Sort a merged post file into text, no-text and re-queue files
    Clean {
        /// Merged post CSV
        input: String,

        /// Stem for the output file names (default: input name without extension)
        #[arg(long)]
        stem: Option<String>,
    },

    /// Validate configuration, and optionally output/input alignment
    Validate {
        /// Merged output CSV to check
        #[arg(long, requires = "input")]
        output: Option<String>,

        /// Input CSV the output was scraped from
        #[arg(long, requires = "output")]
        input: Option<String>,

        #[arg(long, value_enum, default_value_t = RecordKind::Posts)]
        kind: RecordKind,
    },
}

#[derive(Args, Debug)]
struct ScrapeArgs {
    /// Input CSV with `accounts,news_id`
    input: String,

    /// Chunk file prefix
    #[arg(long)]
    prefix: Option<String>,

    /// First chunk to scrape (1-based); earlier chunks are kept as they are
    #[arg(long, default_value_t = 1)]
    start_chunk: usize,

    /// Open Facebook first and wait for Enter, to log in by hand
    #[arg(long)]
    wait_login: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RecordKind {
    Posts,
    Tweets,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Start a browser session, optionally pausing for a manual login.
async fn open_browser(config: &Config, wait_login: bool) -> Result<WebDriverBrowser> {
    let browser = WebDriverBrowser::connect(&config.browser, config.pacing.poll()).await?;

    if wait_login {
        browser.goto(&config.scrape.facebook_base).await?;
        log::info!("Log in in the browser window, then press Enter here.");
        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    }
    Ok(browser)
}

async fn scrape(
    config: &Config,
    storage: &LocalStorage,
    kind: ScrapeKind,
    args: ScrapeArgs,
) -> Result<()> {
    let prefix = args
        .prefix
        .unwrap_or_else(|| kind.default_prefix().to_string());
    let browser = open_browser(config, args.wait_login).await?;

    let outcome = pipeline::run_scrape(
        &browser,
        storage,
        config,
        kind,
        &args.input,
        &prefix,
        args.start_chunk,
    )
    .await;

    if let Err(e) = browser.quit().await {
        log::warn!("Browser did not shut down cleanly: {}", e);
    }
    outcome.map(|_| ())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("postscrape starting...");

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.data_dir.join("config.toml"));
    let config = Config::load_or_default(&config_path);
    log::info!("Loaded configuration from {}", config_path.display());

    let storage = LocalStorage::new(&cli.data_dir);

    match cli.command {
        Command::Classify {
            input,
            videos,
            posts,
        } => {
            pipeline::run_classify(&storage, &input, &videos, &posts).await?;
        }

        Command::Ids {
            input,
            output,
            no_http,
            browser,
        } => {
            let client = if no_http {
                None
            } else {
                Some(http::create_async_client(&config.resolver)?)
            };
            let session = if browser {
                Some(open_browser(&config, false).await?)
            } else {
                None
            };

            let outcome = pipeline::run_ids(
                &storage,
                &input,
                &output,
                client.as_ref(),
                session.as_ref().map(|b| b as &dyn Browser),
                config.pacing.tab_settle(),
            )
            .await;

            if let Some(session) = session {
                if let Err(e) = session.quit().await {
                    log::warn!("Browser did not shut down cleanly: {}", e);
                }
            }
            outcome?;
        }

        Command::Posts(args) => scrape(&config, &storage, ScrapeKind::Posts, args).await?,
        Command::Reels(args) => scrape(&config, &storage, ScrapeKind::Reels, args).await?,
        Command::Tweets(args) => scrape(&config, &storage, ScrapeKind::Tweets, args).await?,

        Command::Merge { prefix, kind } => match kind {
            RecordKind::Posts => {
                pipeline::run_merge::<PostRecord>(&storage, &prefix).await?;
            }
            RecordKind::Tweets => {
                pipeline::run_merge::<TweetRecord>(&storage, &prefix).await?;
            }
        },

        Command::Clean { input, stem } => {
            let stem = stem.unwrap_or_else(|| {
                input
                    .strip_suffix(".csv")
                    .unwrap_or(&input)
                    .to_string()
            });
            pipeline::run_clean(&storage, &input, &stem, &config.cleaning).await?;
        }

        Command::Validate {
            output,
            input,
            kind,
        } => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            if let (Some(output), Some(input)) = (output, input) {
                let alignment = match kind {
                    RecordKind::Posts => {
                        pipeline::run_validate::<PostRecord>(&storage, &output, &input).await?
                    }
                    RecordKind::Tweets => {
                        pipeline::run_validate::<TweetRecord>(&storage, &output, &input).await?
                    }
                };
                if !alignment.is_aligned() {
                    return Err(AppError::validation(format!(
                        "{output} does not line up with {input}"
                    )));
                }
            }

            log::info!("All validations passed!");
        }
    }

    Ok(())
}
