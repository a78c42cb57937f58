//! specrun CLI - oracle-planned REST API test runs from an OpenAPI document

mod storage;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use specrun_core::{
    CaseStore, Config, HistoryStore, JsonDirStore, Operation, Reporter, SuiteReport, coverage_delta,
};
use specrun_runner::{
    CaseOracle, GeminiGenerator, HttpExecutor, OracleError, OracleGateway, Sequencer,
    TextGenerator, load_document, resolve_document,
};

#[derive(Parser)]
#[command(name = "specrun")]
#[command(about = "Run oracle-planned test suites against a REST API described by OpenAPI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Verbose output (info-level logs on stderr)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config file
    Init,

    /// Resolve the spec into operations and store them
    Resolve {
        /// Config file (default: .specrun.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate test cases for stored operations
    Generate {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Endpoint id to generate for (repeatable; default: all)
        #[arg(short = 'e', long = "endpoint")]
        endpoints: Vec<u64>,
    },

    /// Plan and execute stored test cases, then write a report
    Run {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Endpoint id under test (repeatable; default: all)
        #[arg(short = 'e', long = "endpoint")]
        endpoints: Vec<u64>,

        /// Suite name shown in the report
        #[arg(long, default_value = "API Test Suite")]
        suite: String,
    },

    /// Run one positive case per endpoint in dependency order
    Smoke {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short = 'e', long = "endpoint")]
        endpoints: Vec<u64>,
    },

    /// Check config, spec, oracle key and target connectivity
    Doctor {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Export JSON Schema for the report format
    Schema,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

/// `warn` by default, `info` with `--verbose`; `RUST_LOG` overrides both.
fn init_tracing(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Text generator for the configured oracle.
///
/// Without an API key every call fails, so runs degrade to stored order and
/// literal templates instead of aborting.
enum Generator {
    Gemini(GeminiGenerator),
    Unavailable(String),
}

impl Generator {
    fn from_config(cfg: &Config) -> Self {
        match GeminiGenerator::from_settings(&cfg.oracle) {
            Ok(g) => Self::Gemini(g),
            Err(e) => Self::Unavailable(e.to_string()),
        }
    }
}

impl TextGenerator for Generator {
    fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        match self {
            Self::Gemini(g) => g.generate(prompt),
            Self::Unavailable(reason) => Err(OracleError::Transport(reason.clone())),
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let quiet = cli.output == OutputFormat::Silent;
    match cli.command {
        Commands::Init => {
            let config_path = ".specrun.toml";
            if Path::new(config_path).exists() {
                eprintln!("{config_path} already exists");
                return Ok(1);
            }

            std::fs::write(config_path, Config::example())?;
            println!("Created {config_path}");
            println!("\nEdit the file to configure:");
            println!("  - spec: path to your OpenAPI / Swagger document");
            println!("  - base_url: server to test");
            println!("  - headers: headers sent with every request");
            println!("  - oracle.api_key_env: variable holding the oracle API key");
            Ok(0)
        }

        Commands::Resolve { config } => {
            let cfg = Config::resolve(config.as_deref())?;
            let doc = load_document(&cfg.spec)
                .with_context(|| format!("loading {}", cfg.spec.display()))?;
            let resolved = resolve_document(&doc);

            if !quiet {
                for issue in &resolved.issues {
                    eprintln!("  skipped: {issue}");
                }
            }

            let mut store = open_store(&cfg)?;
            let ids = store
                .replace_operations(resolved.operations.clone())
                .context("storing resolved operations")?;
            let stored: Vec<Operation> = resolved
                .operations
                .into_iter()
                .zip(ids)
                .map(|(op, id)| Operation { id: Some(id), ..op })
                .collect();

            match cli.output {
                OutputFormat::Terminal => {
                    println!("Resolved {} operations from {}", stored.len(), cfg.spec.display());
                    for op in &stored {
                        let summary = op.summary.as_deref().unwrap_or("");
                        println!("  [{}] {:<40} {summary}", op.id.unwrap_or_default(), op.label());
                    }
                    if !resolved.issues.is_empty() {
                        println!("  ({} operations skipped)", resolved.issues.len());
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stored)?),
                OutputFormat::Silent => {}
            }
            Ok(if stored.is_empty() { 1 } else { 0 })
        }

        Commands::Generate { config, endpoints } => {
            let cfg = Config::resolve(config.as_deref())?;
            let generator = GeminiGenerator::from_settings(&cfg.oracle)?;
            let gateway = OracleGateway::new(generator, cfg.base_url.clone());
            let mut store = open_store(&cfg)?;
            let ops = select_operations(stored_operations(&store)?, &endpoints);

            if !quiet {
                eprintln!("Generating cases for {} operations...", ops.len());
            }
            let mut total = 0;
            let mut failed = 0;
            for batch in gateway.generate_cases(&ops) {
                let Some(endpoint_id) = batch.endpoint_id else {
                    continue;
                };
                if batch.cases.is_empty() {
                    failed += 1;
                    if !quiet {
                        let reason = batch.error.as_deref().unwrap_or("no cases");
                        eprintln!("  {}: {reason} (previous cases kept)", batch.label);
                    }
                    continue;
                }
                store.create_case_table(endpoint_id)?;
                let mut inserted = 0;
                for case in batch.cases {
                    let name = case.test_name.clone();
                    match store.insert_case(endpoint_id, case) {
                        Ok(_) => inserted += 1,
                        Err(e) => tracing::warn!(test = %name, error = %e, "failed to store case"),
                    }
                }
                total += inserted;
                if !quiet {
                    eprintln!("  [{endpoint_id}] {}: {inserted} cases", batch.label);
                }
            }

            if cli.output == OutputFormat::Json {
                let summary = serde_json::json!({
                    "operations": ops.len(),
                    "cases": total,
                    "failed_operations": failed,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if !quiet {
                println!("Stored {total} cases ({failed} operations without cases)");
            }
            Ok(if failed > 0 && failed == ops.len() { 1 } else { 0 })
        }

        Commands::Run {
            config,
            endpoints,
            suite,
        } => {
            let cfg = Config::resolve(config.as_deref())?;
            let store = open_store(&cfg)?;
            let all = stored_operations(&store)?;
            let under_test = select_operations(all.clone(), &endpoints);
            let gateway = OracleGateway::new(Generator::from_config(&cfg), cfg.base_url.clone());
            let mut http = HttpExecutor::from_settings(&cfg.http)?;

            print_banner(&cfg, quiet);
            let mut reporter = Reporter::start(suite);
            let mut history = HistoryStore::new();
            let mut sequencer = Sequencer::new(&gateway, &store, &mut http, cfg.base_url.clone())
                .with_headers(cfg.headers.clone())
                .with_pacing(cfg.http.pacing());

            for op in &under_test {
                let Some(endpoint_id) = op.id else { continue };
                let cases = match store.list_cases(endpoint_id) {
                    Ok(cases) => cases,
                    Err(e) => {
                        reporter.warn(format!("{}: cannot read cases: {e}", op.label()));
                        continue;
                    }
                };
                if cases.is_empty() {
                    reporter.warn(format!("{}: no cases stored", op.label()));
                    continue;
                }
                if !quiet {
                    eprintln!("[{endpoint_id}] {} ({} cases)", op.label(), cases.len());
                }

                let plan = gateway.plan_order(&all, &cases);
                let stored_ids: Vec<u64> = cases.iter().filter_map(|c| c.id).collect();
                for warning in coverage_delta(&plan, &stored_ids).warnings() {
                    reporter.warn(format!("{}: {warning}", op.label()));
                }
                reporter.extend(sequencer.execute(&plan, Some(endpoint_id), &mut history));
            }

            finish(reporter.finalize(), &cfg, "run", cli.output)
        }

        Commands::Smoke { config, endpoints } => {
            let cfg = Config::resolve(config.as_deref())?;
            let store = open_store(&cfg)?;
            let under_test = select_operations(stored_operations(&store)?, &endpoints);
            let gateway = OracleGateway::new(Generator::from_config(&cfg), cfg.base_url.clone());
            let mut http = HttpExecutor::from_settings(&cfg.http)?;

            print_banner(&cfg, quiet);
            let order = gateway.order_endpoints(&under_test);
            if !quiet {
                let ids: Vec<String> = order.iter().map(u64::to_string).collect();
                eprintln!("Endpoint order: {}", ids.join(", "));
            }

            let mut reporter = Reporter::start("Smoke Test");
            let mut history = HistoryStore::new();
            let results = Sequencer::new(&gateway, &store, &mut http, cfg.base_url.clone())
                .with_headers(cfg.headers.clone())
                .with_pacing(cfg.http.pacing())
                .run_smoke(&order, &mut history);
            reporter.extend(results);

            finish(reporter.finalize(), &cfg, "smoke", cli.output)
        }

        Commands::Doctor { config } => {
            println!("specrun doctor");
            println!("==============\n");

            let cfg = match Config::resolve(config.as_deref()) {
                Ok(cfg) => {
                    println!("[OK] Config file");
                    cfg
                }
                Err(e) => {
                    println!("[NG] Config file: {e}");
                    return Ok(1);
                }
            };
            let mut healthy = true;

            match load_document(&cfg.spec).map(|doc| resolve_document(&doc)) {
                Ok(resolved) => println!(
                    "[OK] Spec file ({}): {} operations, {} skipped",
                    cfg.spec.display(),
                    resolved.operations.len(),
                    resolved.issues.len()
                ),
                Err(e) => {
                    healthy = false;
                    println!("[NG] Spec file ({}): {e}", cfg.spec.display());
                }
            }

            match open_store(&cfg).and_then(|s| stored_operations(&s)) {
                Ok(ops) => println!(
                    "[{}] Store ({}): {} operations",
                    if ops.is_empty() { "--" } else { "OK" },
                    cfg.store_dir.display(),
                    ops.len()
                ),
                Err(e) => {
                    healthy = false;
                    println!("[NG] Store ({}): {e:#}", cfg.store_dir.display());
                }
            }

            if cfg.oracle.api_key().is_some() {
                println!("[OK] Oracle API key (${})", cfg.oracle.api_key_env);
            } else {
                println!(
                    "[--] Oracle API key (${} not set; runs fall back to stored order)",
                    cfg.oracle.api_key_env
                );
            }

            let http = HttpExecutor::from_settings(&cfg.http)?;
            let connectivity = http.check_connectivity(&cfg.base_url);
            if connectivity.reachable {
                println!("[OK] Target reachable: {}", connectivity.detail);
            } else {
                healthy = false;
                println!("[NG] Target unreachable: {}", connectivity.detail);
            }

            if !Path::new(".specrun.toml").exists() && config.is_none() {
                println!("\nCreate config file:");
                println!("  specrun init");
            }
            Ok(if healthy { 0 } else { 1 })
        }

        Commands::Schema => {
            let schema = specrun_core::schema::generate_schema();
            println!("{schema}");
            Ok(0)
        }
    }
}

fn open_store(cfg: &Config) -> Result<JsonDirStore> {
    JsonDirStore::open(&cfg.store_dir)
        .with_context(|| format!("opening store {}", cfg.store_dir.display()))
}

fn stored_operations(store: &JsonDirStore) -> Result<Vec<Operation>> {
    let ops = store.list_operations()?;
    if ops.is_empty() {
        bail!("no operations stored; run `specrun resolve` first");
    }
    Ok(ops)
}

/// Operations whose id is in `ids`, in stored order; all of them when `ids` is empty.
fn select_operations(all: Vec<Operation>, ids: &[u64]) -> Vec<Operation> {
    if ids.is_empty() {
        return all;
    }
    for id in ids {
        if !all.iter().any(|op| op.id == Some(*id)) {
            tracing::warn!(endpoint = id, "unknown endpoint id, ignoring");
        }
    }
    all.into_iter()
        .filter(|op| op.id.is_some_and(|id| ids.contains(&id)))
        .collect()
}

fn print_banner(cfg: &Config, quiet: bool) {
    if quiet {
        return;
    }
    eprintln!("Config:");
    eprintln!("  spec:     {}", cfg.spec.display());
    eprintln!("  base_url: {}", cfg.base_url);
    if !cfg.headers.is_empty() {
        eprintln!("  headers:  {} configured", cfg.headers.len());
    }
    eprintln!();
}

/// Persist and print the report; exit 0 when everything passed, 1 otherwise,
/// 3 when nothing ran at all.
fn finish(report: SuiteReport, cfg: &Config, mode: &str, output: OutputFormat) -> Result<i32> {
    match storage::save_report(&report, cfg, mode) {
        Ok(dir) => {
            if output != OutputFormat::Silent {
                eprintln!("Report saved: {}", dir.display());
            }
        }
        Err(e) => eprintln!("Warning: failed to save report: {e:#}"),
    }

    match output {
        OutputFormat::Terminal => println!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", report.redacted().to_json()?),
        OutputFormat::Silent => {}
    }

    if report.summary.total_tests == 0 {
        eprintln!("Error: No tests were executed. Check stored cases and endpoint ids.");
        return Ok(3);
    }
    Ok(if report.all_passed() { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use specrun_core::HttpMethod;

    fn ops() -> Vec<Operation> {
        (1..=3)
            .map(|i| Operation {
                id: Some(i),
                ..Operation::new(HttpMethod::Get, format!("/r{i}"))
            })
            .collect()
    }

    #[test]
    fn select_all_when_empty() {
        assert_eq!(select_operations(ops(), &[]).len(), 3);
    }

    #[test]
    fn select_keeps_stored_order() {
        let picked = select_operations(ops(), &[3, 1, 9]);
        let ids: Vec<_> = picked.iter().filter_map(|op| op.id).collect();
        assert_eq!(ids, [1, 3]);
    }

    #[test]
    fn missing_key_degrades() {
        let generator = Generator::Unavailable("API key not set".into());
        assert!(matches!(
            generator.generate("hi"),
            Err(OracleError::Transport(msg)) if msg.contains("API key")
        ));
    }

    #[test]
    fn cli_parses_repeated_endpoints() {
        let cli = Cli::try_parse_from([
            "specrun", "--output", "json", "run", "-e", "2", "-e", "5", "--suite", "nightly",
        ])
        .unwrap();
        assert!(cli.output == OutputFormat::Json);
        match cli.command {
            Commands::Run {
                endpoints, suite, ..
            } => {
                assert_eq!(endpoints, [2, 5]);
                assert_eq!(suite, "nightly");
            }
            _ => panic!("expected run"),
        }
    }
}
