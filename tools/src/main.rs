//! compare-runner: headless driver for the tariff comparison engine.
//!
//! Usage:
//!   compare-runner --db tariffs.db --data-dir ./data --import
//!   compare-runner --db tariffs.db --profile ./data/profiles/household_4000.json
//!   compare-runner --db tariffs.db --ipc-mode

use anyhow::Result;
use std::env;
use std::io::{self, BufRead, Write};
use tariff_core::{
    comparison::NewComparison,
    config::{CatalogFile, EngineConfig},
    cost::CalculationOverrides,
    engine::{CalculationEngine, CalculationResult},
    error::EngineError,
    store::TariffStore,
};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    CreateComparison {
        profile: NewComparison,
    },
    Calculate {
        comparison_id: String,
        #[serde(default)]
        overrides: Option<CalculationOverrides>,
    },
    Preview {
        comparison_id: String,
        #[serde(default)]
        overrides: Option<CalculationOverrides>,
    },
    GetResults {
        comparison_id: String,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct IpcResults<'a> {
    comparison_id: &'a str,
    results:       Vec<CalculationResult>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let import = args.iter().any(|a| a == "--import");
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");
    let profile_path = arg_value(&args, "--profile");

    if !ipc_mode {
        println!("Tariff comparison: compare-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let store = TariffStore::open(db)?;
    store.migrate()?;

    // An in-memory database starts empty, so the catalog is always loaded.
    if import || db == ":memory:" {
        let catalog = CatalogFile::load(data_dir)?;
        store.import_catalog(&catalog)?;
    }

    let config = match EngineConfig::load(data_dir) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("{e}; using statutory defaults");
            EngineConfig::default()
        }
    };
    let engine = CalculationEngine::new(&store, config);

    if ipc_mode {
        run_ipc_loop(&engine, &store)?;
    } else if let Some(path) = profile_path {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let input: NewComparison = serde_json::from_str(&content)?;
        let profile = store.create_comparison(input)?;
        let results = engine.calculate_and_save(&profile.comparison_id, None)?;
        print_summary(&store, &profile.comparison_id, profile.current_bill, &results)?;
    } else if !import {
        println!("Nothing to do: pass --import, --profile <file> or --ipc-mode.");
    }

    drop(engine);
    store.close()?;
    Ok(())
}

fn run_ipc_loop(engine: &CalculationEngine<'_>, store: &TariffStore) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string(), "status": 400 });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let response = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::CreateComparison { profile } => store
                .create_comparison(profile)
                .map(|p| serde_json::json!({ "comparison": p })),
            IpcCommand::Calculate { comparison_id, overrides } => engine
                .calculate_and_save(&comparison_id, overrides.as_ref())
                .and_then(|results| results_json(&comparison_id, results)),
            IpcCommand::Preview { comparison_id, overrides } => engine
                .preview(&comparison_id, overrides.as_ref())
                .and_then(|results| results_json(&comparison_id, results)),
            IpcCommand::GetResults { comparison_id } => engine
                .results(&comparison_id)
                .and_then(|results| results_json(&comparison_id, results)),
        };

        let line = match response {
            Ok(value) => value,
            Err(e) => error_json(&e),
        };
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn results_json(
    comparison_id: &str,
    results: Vec<CalculationResult>,
) -> Result<serde_json::Value, EngineError> {
    Ok(serde_json::to_value(IpcResults { comparison_id, results })?)
}

fn error_json(e: &EngineError) -> serde_json::Value {
    if e.status_code() >= 500 {
        log::error!("ipc: {e}");
    }
    serde_json::json!({ "error": e.to_string(), "status": e.status_code() })
}

fn print_summary(
    store: &TariffStore,
    comparison_id: &str,
    current_bill: f64,
    results: &[CalculationResult],
) -> Result<()> {
    let providers = store.providers()?;
    let provider_name = |id: &str| {
        providers
            .iter()
            .find(|p| p.provider_id == id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    println!("=== COMPARISON {comparison_id} ===");
    println!("  current bill:   {current_bill:.2} €");
    println!("  tariffs ranked: {}", results.len());
    println!();
    if results.is_empty() {
        println!("  (No applicable tariffs)");
        return Ok(());
    }
    for r in results {
        println!(
            "  #{:<2} {:<26} {:<20} | Total: {:>9.2} € | Savings: {:>9.2} € | Commission: {:>7.2} €",
            r.rank,
            provider_name(&r.provider_id),
            r.offer_name,
            r.cost.total,
            r.cost.savings,
            r.commission.value
        );
    }
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
