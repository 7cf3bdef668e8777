//! risk-cli: score a single transaction from the command line.
//!
//! Usage:
//!   risk-cli --artifacts ./model --type TRANSFER --amount 150000 \
//!            --old-balance-org 150000 --new-balance-orig 0 \
//!            --date 2017-01-03 --time 14:30
//!   risk-cli --db audit.db --seed 7 ...

use anyhow::Result;
use fraudscore_core::{
    audit::{AuditSink, CsvAuditLog},
    config::DEFAULT_AUDIT_FILE,
    engine::ScoringEngine,
    input::RawTransaction,
    rng::{EntropyFlagSource, FlagSource, SeededFlagSource},
    store::SqliteAuditStore,
    types::RiskResult,
};
use std::env;
use std::path::Path;
use std::process::ExitCode;

#[derive(serde::Serialize)]
struct CliOutput<'a> {
    #[serde(flatten)]
    result: &'a RiskResult,
    label_class: &'static str,
    audited: bool,
}

fn main() -> Result<ExitCode> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let artifacts = flag_value(&args, "--artifacts").unwrap_or(".");
    let audit_path = flag_value(&args, "--audit").unwrap_or(DEFAULT_AUDIT_FILE);
    let db = flag_value(&args, "--db");
    let seed = parse_seed(flag_value(&args, "--seed"));

    let sink: Box<dyn AuditSink> = match db {
        Some(db) => Box::new(SqliteAuditStore::open(db)?),
        None => Box::new(CsvAuditLog::new(audit_path)),
    };
    let engine = ScoringEngine::build(Path::new(artifacts), sink);
    if !engine.model_loaded() {
        log::warn!("no model loaded from {artifacts}; every request will be rejected");
    }

    let raw = raw_from_args(&args);
    let mut flags: Box<dyn FlagSource> = match seed {
        Some(seed) => Box::new(SeededFlagSource::new(seed)),
        None => Box::new(EntropyFlagSource::new()),
    };

    match engine.score_raw(&raw, flags.as_mut()) {
        Ok(decision) => {
            if let Some(e) = &decision.audit_error {
                eprintln!("warning: {e}");
            }
            let out = CliOutput {
                result: &decision.result,
                label_class: decision.result.label.css_class(),
                audited: decision.audited(),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// A seed that does not parse is reported, then ignored.
fn parse_seed(raw: Option<&str>) -> Option<u64> {
    let raw = raw?;
    match raw.trim().parse::<u64>() {
        Ok(seed) => Some(seed),
        Err(e) => {
            log::warn!("ignoring --seed {raw:?} ({e}); flag draws will not be reproducible");
            None
        }
    }
}

/// Unset fields take the same defaults the entry form starts with.
fn raw_from_args(args: &[String]) -> RawTransaction {
    let now = chrono::Local::now().naive_local();
    RawTransaction {
        date: flag_value(args, "--date")
            .map(str::to_string)
            .unwrap_or_else(|| now.format("%Y-%m-%d").to_string()),
        time: flag_value(args, "--time")
            .map(str::to_string)
            .unwrap_or_else(|| now.format("%H:%M").to_string()),
        txn_type: arg_or(args, "--type", "PAYMENT"),
        amount: arg_or(args, "--amount", "1000.0"),
        old_balance_origin: arg_or(args, "--old-balance-org", "5000.0"),
        new_balance_origin: arg_or(args, "--new-balance-orig", "4000.0"),
        old_balance_dest: arg_or(args, "--old-balance-dest", "0.0"),
        new_balance_dest: arg_or(args, "--new-balance-dest", "4000.0"),
        origin_account: arg_or(args, "--origin", ""),
        destination_account: arg_or(args, "--dest", ""),
    }
}

fn arg_or(args: &[String], flag: &str, default: &str) -> String {
    flag_value(args, flag).unwrap_or(default).to_string()
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
