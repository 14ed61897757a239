//! # Thread Digest CLI (`tdg`)
//!
//! The `tdg` binary harvests recent Reddit activity and summarizes it with
//! an interchangeable LLM backend, or tails a subreddit's live comment feed
//! at a bounded rate.
//!
//! ## Usage
//!
//! ```bash
//! tdg --config ./tdg.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tdg summarize <channels>` | Harvest a time window and produce a cited summary per channel |
//! | `tdg stream <channel>` | Tail the live comment feed with rate limiting |
//! | `tdg backends` | Show configured backends and their availability |
//! | `tdg clean <file>` | Run the text normalizer over a file and print the result |
//!
//! ## Examples
//!
//! ```bash
//! # Summarize the last 24 hours of r/rust with a local Ollama
//! tdg summarize rust
//!
//! # Two channels, 48 hours, Claude, judging posts by latest comment activity
//! tdg summarize rust programming --hours 48 --backend claude --threads
//!
//! # Hot posts filtered to a topic, without saving anything
//! tdg summarize rust --order hot --topics async --no-save --no-raw
//!
//! # Stream at most 10 comments per minute for five minutes
//! tdg stream rust --per-minute 10 --duration-secs 300
//! ```

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use thread_digest::config::{self, Config};
use thread_digest::connector_reddit::RedditSource;
use thread_digest::corpus::ReferenceCorpus;
use thread_digest::models::TimeWindow;
use thread_digest::source::{ContentSource, FeedOrder};
use thread_digest::summarize::Backend;
use thread_digest::{clean, filter, footnotes, harvest, output, stream, summarize};

/// Thread Digest CLI — harvest and summarize Reddit activity.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; when the file does not exist, built-in defaults apply.
#[derive(Parser)]
#[command(
    name = "tdg",
    about = "Thread Digest — harvest Reddit activity and summarize it with an LLM backend",
    version,
    long_about = "Thread Digest pulls recent posts and comments from one or more subreddits, \
    builds a reference-indexed corpus fitted to the backend's token budget, and produces a \
    summary with numbered citations. It can also tail a subreddit's live comment feed at a \
    bounded rate."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Harvest limits, token budgets, backend models, stream pacing, and the
    /// output directory are read from this file.
    #[arg(long, global = true, default_value = "./tdg.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Harvest a time window and produce a cited summary per channel.
    ///
    /// Each channel is processed independently; a failure on one channel is
    /// reported and the run continues with the next.
    Summarize {
        /// Subreddit names, without the `r/` prefix.
        #[arg(required = true)]
        channels: Vec<String>,

        /// Look-back window in hours.
        #[arg(long, default_value_t = 24)]
        hours: u64,

        /// Summarization backend.
        #[arg(long, value_enum, default_value = "ollama")]
        backend: Backend,

        /// Post feed order. `hot` disables the chronological early-exit scan.
        #[arg(long, value_enum, default_value = "new")]
        order: FeedOrder,

        /// Judge posts by their latest comment activity instead of creation
        /// time, so older posts with fresh discussion stay in the window.
        #[arg(long)]
        threads: bool,

        /// Keep only items whose text mentions one of these topics.
        #[arg(long, num_args = 1..)]
        topics: Vec<String>,

        /// Skip stopword removal and normalization of harvested text.
        #[arg(long)]
        no_clean: bool,

        /// Do not save the summary to the output directory.
        #[arg(long)]
        no_save: bool,

        /// Do not save the raw harvest JSON.
        #[arg(long)]
        no_raw: bool,
    },

    /// Tail a channel's live comment feed with rate limiting.
    ///
    /// Runs until the duration elapses or Enter is pressed. Pacing defaults
    /// to the configured per-minute window.
    Stream {
        /// Subreddit name, without the `r/` prefix.
        channel: String,

        /// Cap deliveries to this many per rolling minute.
        #[arg(long, conflicts_with_all = ["delay_secs", "unpaced"])]
        per_minute: Option<u32>,

        /// Fixed delay between items, in seconds.
        #[arg(long, conflicts_with = "unpaced")]
        delay_secs: Option<u64>,

        /// Deliver as fast as the feed produces.
        #[arg(long)]
        unpaced: bool,

        /// Stop after this many seconds.
        #[arg(long)]
        duration_secs: Option<u64>,
    },

    /// Show configured backends, their models, and availability.
    Backends,

    /// Run the text normalizer over a file and print the result.
    Clean {
        /// Path to a UTF-8 text file.
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Clean needs no config at all.
    if let Commands::Clean { file } = &cli.command {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        println!("{}", clean::clean_text(&text));
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Summarize {
            channels,
            hours,
            backend,
            order,
            threads,
            topics,
            no_clean,
            no_save,
            no_raw,
        } => run_summarize(
            &cfg, &channels, hours, backend, order, threads, &topics, no_clean, no_save, no_raw,
        ),
        Commands::Stream {
            channel,
            per_minute,
            delay_secs,
            unpaced,
            duration_secs,
        } => run_stream(&cfg, &channel, per_minute, delay_secs, unpaced, duration_secs),
        Commands::Backends => {
            run_backends(&cfg);
            Ok(())
        }
        Commands::Clean { .. } => unreachable!(),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_summarize(
    cfg: &Config,
    channels: &[String],
    hours: u64,
    backend: Backend,
    order: FeedOrder,
    threads: bool,
    topics: &[String],
    no_clean: bool,
    no_save: bool,
    no_raw: bool,
) -> Result<()> {
    if hours == 0 {
        bail!("--hours must be at least 1");
    }

    let source = RedditSource::new(cfg.backends.timeout_secs, cfg.stream.poll_secs)?;
    let options = harvest::HarvestOptions {
        order,
        thread_completion: threads,
        clean: !no_clean,
    };
    let mut failures = 0usize;

    for channel in channels {
        println!("== r/{channel} ==");
        let window = TimeWindow::last_hours(hours as i64);

        let harvested = match harvest::fetch_window(&source, channel, window, &cfg.harvest, &options)
        {
            Ok(harvested) => harvested,
            Err(err) => {
                eprintln!("r/{channel}: harvest failed: {err}");
                failures += 1;
                continue;
            }
        };
        let harvested = filter::filter_by_topics(harvested, topics);
        println!(
            "harvested {} posts, {} comments in the last {hours}h",
            harvested.posts.len(),
            harvested.comments.len()
        );

        if harvested.is_empty() {
            println!("nothing to summarize");
            continue;
        }

        if !no_raw {
            if let Err(err) = output::save_raw(&cfg.output.dir, channel, &harvested) {
                eprintln!("r/{channel}: {err:#}");
            }
        }

        let corpus = ReferenceCorpus::from_harvest(&harvested, cfg.harvest.comment_sample);
        let result = summarize::summarize(cfg, &corpus, channel, backend);

        if let Some(error) = &result.error {
            eprintln!("r/{channel}: {} summarization failed: {error}", result.backend);
            failures += 1;
            continue;
        }

        let text = footnotes::format_with_footnotes(&result.summary, &result.references);
        println!("\n{text}\n");

        if !no_save {
            let params = output::RunParameters {
                channel,
                window: &window,
                hours,
                options: &options,
                topics,
            };
            if let Err(err) = output::save_summary(&cfg.output.dir, &params, &result, &text) {
                eprintln!("r/{channel}: {err:#}");
            }
        }
    }

    if failures == channels.len() {
        bail!("all {failures} channel(s) failed");
    }
    Ok(())
}

fn run_stream(
    cfg: &Config,
    channel: &str,
    per_minute: Option<u32>,
    delay_secs: Option<u64>,
    unpaced: bool,
    duration_secs: Option<u64>,
) -> Result<()> {
    let pace = if unpaced {
        stream::Pace::Unpaced
    } else if let Some(delay) = delay_secs {
        stream::Pace::PerItem(Duration::from_secs(delay))
    } else {
        stream::Pace::Windowed {
            items: per_minute.unwrap_or(cfg.stream.per_minute),
            period: Duration::from_secs(60),
        }
    };
    let options = stream::StreamOptions {
        pace,
        duration: duration_secs.map(Duration::from_secs),
    };

    let stop = Arc::new(AtomicBool::new(false));
    spawn_stop_listener(Arc::clone(&stop));

    let source = RedditSource::new(cfg.backends.timeout_secs, cfg.stream.poll_secs)?;
    println!("streaming r/{channel} (press Enter to stop)");
    let items = source.stream_comments(channel)?;

    let reason = stream::run(items, options, &stop, |item| {
        println!("[{}] u/{}: {}", item.created_at.format("%H:%M:%S"), item.author, item.body);
        Ok(())
    })?;

    println!("stream finished: {reason:?}");
    Ok(())
}

/// Flip the stop flag when the user presses Enter.
fn spawn_stop_listener(stop: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        stop.store(true, Ordering::Relaxed);
    });
}

fn run_backends(cfg: &Config) {
    let key_status = |var: &str| {
        if std::env::var(var).is_ok() {
            "ready"
        } else {
            "missing API key"
        }
    };
    println!("openai   model={}  {}", cfg.backends.openai.model, key_status("OPENAI_API_KEY"));
    println!("claude   model={}  {}", cfg.backends.claude.model, key_status("ANTHROPIC_API_KEY"));
    println!(
        "ollama   model={}  url={} (availability checked at request time)",
        cfg.backends.ollama.model, cfg.backends.ollama.url
    );
}
