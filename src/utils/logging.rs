//! Logging helpers
//!
//! Subscriber setup, the run log file and the banner-style progress messages
//! printed by the batch app.

use std::fs::{self, OpenOptions};
use std::io::Write;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Install the fmt subscriber; `RUST_LOG` overrides the default level
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Create (or truncate) the run log with a timestamped header
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\nDocument processing log - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

pub fn append_log_line(log_file_path: &str, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 starting document summarization");
    info!(
        "📊 documents in flight: {}, chunk calls per document: {}",
        config.max_concurrent_documents, config.max_concurrent_chunks
    );
    info!(
        "✂️ chunk size: {}, overlap: {}",
        config.chunk_size, config.chunk_overlap
    );
    info!("🤖 model: {}", config.llm_model_name);
    info!("{}", "=".repeat(60));
}

pub fn log_documents_loaded(total: usize, max_concurrent: usize) {
    info!("✓ found {} documents to process", total);
    info!("📋 processing up to {} at a time\n", max_concurrent);
}

pub fn print_final_stats(success: usize, failed: usize, total: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 processing finished");
    info!(
        "finished at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ completed: {}/{}", success, total);
    info!("❌ failed: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\nrun log saved to: {}", log_file_path);
}

/// Shorten long text for log output
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_log_file_header_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let path = path.to_str().unwrap();

        init_log_file(path).unwrap();
        append_log_line(path, "OK      a.pdf").unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("Document processing log"));
        assert!(content.ends_with("OK      a.pdf\n"));
    }
}
