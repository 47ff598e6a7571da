//! # Bulk Configuration Validator
//!
//! A command-line utility for checking a bulk engine configuration before it
//! is rolled out, and for previewing how a given number of items would be
//! chunked under it.
//!
//! ## Usage
//!
//! ### Validate a JSON Configuration
//!
//! ```bash
//! cargo run --bin config-validator bulk.json
//! ```
//!
//! ### Validate a Registry Dump
//!
//! Any file not ending in `.json` is read as `key: value` lines; only
//! `bildungslogin/assignment/chunksize` is interpreted.
//!
//! ```bash
//! cargo run --bin config-validator registry.txt 130
//! ```
//!
//! ## Output Example
//!
//! ```text
//! Validating configuration: registry.txt
//! ✓ Configuration is valid!
//!
//! Configuration Summary:
//!   Chunk size: 60
//!   Failure merge: LastChunkWins
//!   Retries: 2 (100ms initial, 5000ms max, exponential)
//!   Retry delays: 100ms, 200ms
//!
//! Plan for 130 items:
//!   Chunks: 3
//!   Progress reporting: yes
//! ```
//!
//! ## Exit Codes
//!
//! - `0`: The configuration is valid
//! - `1`: The configuration is invalid or could not be read

use school_license_bulk::bulk::ChunkPlanner;
use school_license_bulk::config::{BulkConfig, parse_registry};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json|registry-dump> [item-count]", args[0]);
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  {} bulk.json", args[0]);
        eprintln!("  {} registry.txt 130", args[0]);
        process::exit(1);
    }

    let path = Path::new(&args[1]);
    println!("Validating configuration: {}", path.display());

    let config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {}", e);
            process::exit(1);
        }
    };
    println!("✓ Configuration is valid!");
    print_config_summary(&config);

    if let Some(raw) = args.get(2) {
        match raw.parse::<usize>() {
            Ok(items) => print_plan(&config, items),
            Err(_) => {
                eprintln!("Error: '{}' is not a valid item count", raw);
                process::exit(1);
            }
        }
    }
}

fn load_config(path: &Path) -> Result<BulkConfig, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let config = if path.extension().and_then(|s| s.to_str()) == Some("json") {
        BulkConfig::from_json(&content)?
    } else {
        BulkConfig::from_registry(&parse_registry(&content))?
    };
    Ok(config)
}

fn print_config_summary(config: &BulkConfig) {
    let retry = &config.retry;
    println!("\nConfiguration Summary:");
    println!("  Chunk size: {}", config.chunk_size);
    println!("  Failure merge: {:?}", config.failure_merge);
    println!(
        "  Retries: {} ({}ms initial, {}ms max, {})",
        retry.max_retries,
        retry.initial_delay_ms,
        retry.max_delay_ms,
        if retry.exponential_backoff {
            "exponential"
        } else {
            "constant"
        }
    );
    if retry.max_retries > 0 {
        let delays: Vec<String> = (1..=retry.max_retries)
            .map(|n| format!("{}ms", retry.delay_for(n).as_millis()))
            .collect();
        println!("  Retry delays: {}", delays.join(", "));
    }
}

fn print_plan(config: &BulkConfig, items: usize) {
    let planner = match ChunkPlanner::new(config.chunk_size) {
        Ok(planner) => planner,
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(1);
        }
    };
    let plan = planner.plan(items);
    println!("\nPlan for {} items:", items);
    println!("  Chunks: {}", plan.chunk_count);
    println!(
        "  Progress reporting: {}",
        if plan.is_chunked() { "yes" } else { "no" }
    );
}
