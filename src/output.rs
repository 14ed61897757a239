//! Saving summaries and raw harvests to disk.
//!
//! Each channel gets its own subdirectory under the configured output dir,
//! with timestamped filenames so repeated runs never clobber each other.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::harvest::HarvestOptions;
use crate::models::{Harvest, SummaryResult, TimeWindow};

/// Run parameters echoed at the top of every saved summary.
pub struct RunParameters<'a> {
    pub channel: &'a str,
    pub window: &'a TimeWindow,
    pub hours: u64,
    pub options: &'a HarvestOptions,
    pub topics: &'a [String],
}

fn channel_dir(base: &Path, channel: &str) -> Result<PathBuf> {
    let dir = base.join(channel);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    Ok(dir)
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Write the summary text with a parameter header. Returns the saved path.
pub fn save_summary(
    base: &Path,
    params: &RunParameters,
    result: &SummaryResult,
    text: &str,
) -> Result<PathBuf> {
    let dir = channel_dir(base, params.channel)?;
    let path = dir.join(format!("summary_{}_{}.txt", params.channel, timestamp(Utc::now())));

    let mut header = String::new();
    header.push_str("ANALYSIS PARAMETERS:\n");
    header.push_str(&format!("Subreddit: r/{}\n", params.channel));
    header.push_str(&format!(
        "Time window: last {} hours (cutoff {})\n",
        params.hours,
        params.window.cutoff.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    header.push_str(&format!("Sort order: {}\n", params.options.order.as_str()));
    header.push_str(&format!(
        "Thread completion: {}\n",
        if params.options.thread_completion { "enabled" } else { "disabled" }
    ));
    header.push_str(&format!(
        "Text cleaning: {}\n",
        if params.options.clean { "enabled" } else { "disabled" }
    ));
    if !params.topics.is_empty() {
        header.push_str(&format!("Topics: {}\n", params.topics.join(", ")));
    }
    header.push_str(&format!("Backend: {} ({})\n", result.backend, result.model));
    header.push_str(&"=".repeat(50));
    header.push_str("\n\n");

    fs::write(&path, format!("{header}{text}\n"))
        .with_context(|| format!("failed to write summary to {}", path.display()))?;
    info!(path = %path.display(), "saved summary");
    Ok(path)
}

/// Write the raw harvest as pretty-printed JSON. Returns the saved path.
pub fn save_raw(base: &Path, channel: &str, harvest: &Harvest) -> Result<PathBuf> {
    let dir = channel_dir(base, channel)?;
    let path = dir.join(format!("raw_data_{}_{}.json", channel, timestamp(Utc::now())));

    let json = serde_json::to_string_pretty(harvest).context("failed to serialize harvest")?;
    fs::write(&path, json)
        .with_context(|| format!("failed to write raw data to {}", path.display()))?;
    info!(path = %path.display(), "saved raw harvest");
    Ok(path)
}
