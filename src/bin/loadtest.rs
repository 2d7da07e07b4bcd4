//! plankdb Load Test
//!
//! Inserts N rows into a fresh database, looks every row up by id through
//! the index, then runs one range query across all ids.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use plankdb::{Config, DataType, Database, Schema, Value};
use tracing_subscriber::{fmt, EnvFilter};

const TABLE: &str = "loadtest";

/// plankdb load test
#[derive(Parser, Debug)]
#[command(name = "plankdb-loadtest")]
#[command(about = "Insert and query rows through plankdb's B+Tree indexes")]
#[command(version)]
struct Args {
    /// Data directory (must not already hold a database)
    #[arg(short, long, default_value = "./plankdb_loadtest")]
    data_dir: PathBuf,

    /// Number of rows to insert
    #[arg(short, long, default_value = "1000000")]
    rows: i64,

    /// Nodes each index keeps cached before flushing
    #[arg(short, long, default_value = "10000")]
    cache_capacity: usize,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,plankdb=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();
    tracing::info!("plankdb load test v{}", plankdb::VERSION);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("load test failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when a lookup returned the wrong rows
fn run(args: &Args) -> plankdb::Result<bool> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .cache_capacity(args.cache_capacity)
        .build();
    let schema = Schema::builder(TABLE)
        .indexed_column("score", DataType::Int64)
        .column("label", DataType::String(16))
        .build()?;
    let db = Database::create(config, vec![schema])?;

    let start = Instant::now();
    for i in 1..=args.rows {
        db.insert(TABLE, vec![Value::Int64(i * 10), Value::Text(format!("row{}", i))])?;
    }
    tracing::info!(rows = args.rows, elapsed = ?start.elapsed(), "inserted");

    let start = Instant::now();
    let mut mismatches = 0u64;
    for id in 1..=args.rows {
        let handles = db.query(TABLE, "id", &Value::Int64(id))?;
        let ok = match handles.as_slice() {
            [handle] => db.get(handle, "id")? == Value::Int64(id),
            _ => false,
        };
        if !ok {
            mismatches += 1;
            if mismatches <= 10 {
                tracing::warn!(id, found = handles.len(), "id lookup returned the wrong rows");
            }
        }
    }
    tracing::info!(rows = args.rows, elapsed = ?start.elapsed(), "queried every id");

    let start = Instant::now();
    let all = db.range_query(TABLE, "id", &Value::Int64(1), &Value::Int64(args.rows))?;
    tracing::info!(found = all.len(), elapsed = ?start.elapsed(), "range query over all ids");
    if all.len() as i64 != args.rows.max(0) {
        tracing::warn!(expected = args.rows, found = all.len(), "range query count mismatch");
        mismatches += 1;
    }

    db.close()?;

    if mismatches > 0 {
        tracing::error!(mismatches, "load test found mismatches");
        return Ok(false);
    }
    tracing::info!("load test passed");
    Ok(true)
}
