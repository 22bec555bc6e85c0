//! calweave - content-calendar generation CLI
//!
//! ## Commands
//!
//! - `run`: Generate a calendar for one subject and write the run report
//! - `show-report`: Print a stored run report after verifying its digest
//! - `registry-status`: Summarize registered data sources
//! - `validate-sources`: Fetch and validate every data source once
//! - `evolution-status`: Show versions, targets and readiness per source
//! - `evolve`: Upgrade one source, or every ready source

use anyhow::{bail, Context, Result};
use calweave_core::telemetry::init_tracing;
use calweave_core::{
    default_evolution_manager, default_registry, read_pipeline_report, write_pipeline_report,
    CalendarPipeline, CalweaveConfig, EvolutionRecord, GenerationConfig, PipelineReport,
    VERSION,
};
use calweave_textgen::fakes::FailingGenerator;
use calweave_textgen::{BoundedGenerator, HttpGeneratorConfig, HttpTextGenerator, TextGenerator};
use clap::{Parser, Subcommand};
use semver::Version;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_REPORT_DIR: &str = ".calweave/runs";

#[derive(Parser)]
#[command(name = "calweave")]
#[command(version = VERSION)]
#[command(about = "Strategy-aware content calendar generation", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "CALWEAVE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the twelve-step pipeline for one subject
    Run {
        /// User the calendar is generated for
        #[arg(short, long)]
        user: String,

        /// Strategy or subject identifier
        #[arg(short, long)]
        subject: String,

        /// JSON file mapping step keys (step_04) to results used instead of running them
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Where to write the run report (default: config report_dir, then .calweave/runs)
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Print the whole report as JSON
        #[arg(long)]
        raw: bool,
    },

    /// Print a stored run report
    ShowReport {
        /// Run ID to load
        #[arg(long)]
        run: String,

        /// Directory holding run reports
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },

    /// Summarize registered data sources
    RegistryStatus {
        /// Print the status as JSON
        #[arg(long)]
        raw: bool,
    },

    /// Fetch and validate every data source with a sample subject
    ValidateSources,

    /// Show evolution readiness per source
    EvolutionStatus {
        /// Print the status as JSON
        #[arg(long)]
        raw: bool,
    },

    /// Evolve one source, or every ready source when none is named
    Evolve {
        /// Source to evolve
        source: Option<String>,

        /// Target version (default: the configured target)
        #[arg(long)]
        to: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json {
        config.logging.json = true;
    }
    init_tracing(&config.logging);
    info!(version = VERSION, "calweave starting");

    let generator = build_generator(&config.generation);

    match cli.command {
        Commands::Run {
            user,
            subject,
            overrides,
            report_dir,
            raw,
        } => {
            if config.generation.endpoint.is_none() {
                bail!("no generation endpoint configured; set CALWEAVE_TEXTGEN_URL or [generation].endpoint");
            }
            let dir = report_dir_for(report_dir, &config);
            let report = cmd_run(
                generator,
                &config,
                &user,
                &subject,
                overrides.as_deref(),
                &dir,
            )
            .await?;
            if raw {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render_report(&report));
            }
            if !report.succeeded() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::ShowReport { run, report_dir } => {
            let dir = report_dir_for(report_dir, &config);
            let report = cmd_show_report(&run, &dir)?;
            println!("{}", render_report(&report));
            Ok(())
        }
        Commands::RegistryStatus { raw } => cmd_registry_status(generator, raw).await,
        Commands::ValidateSources => cmd_validate_sources(generator).await,
        Commands::EvolutionStatus { raw } => cmd_evolution_status(generator, raw).await,
        Commands::Evolve { source, to } => {
            let records = cmd_evolve(generator, source.as_deref(), to.as_deref()).await?;
            for record in &records {
                println!("{}", render_evolution(record));
            }
            if records.is_empty() {
                println!("Nothing to evolve.");
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<CalweaveConfig> {
    match path {
        Some(path) => CalweaveConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path)),
        None => CalweaveConfig::from_env().context("Invalid CALWEAVE_* environment"),
    }
}

/// HTTP generator behind the configured bounds. Without an endpoint every
/// call fails, which status commands never make.
fn build_generator(config: &GenerationConfig) -> Arc<dyn TextGenerator> {
    let inner: Arc<dyn TextGenerator> = match &config.endpoint {
        Some(endpoint) => {
            let mut http = HttpGeneratorConfig::new(endpoint);
            if let Some(token) = &config.token {
                http = http.with_token(token);
            }
            Arc::new(HttpTextGenerator::new(http))
        }
        None => {
            warn!("no generation endpoint configured; remote calls will fail");
            Arc::new(FailingGenerator::transport("no generation endpoint configured"))
        }
    };
    Arc::new(BoundedGenerator::new(inner, config.bounds()))
}

fn report_dir_for(flag: Option<PathBuf>, config: &CalweaveConfig) -> PathBuf {
    flag.or_else(|| config.report_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_DIR))
}

fn read_overrides(path: &Path) -> Result<BTreeMap<String, Value>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read overrides file: {:?}", path))?;
    serde_json::from_str(&raw).context("Overrides must be a JSON object of step results")
}

async fn cmd_run(
    generator: Arc<dyn TextGenerator>,
    config: &CalweaveConfig,
    user: &str,
    subject: &str,
    overrides: Option<&Path>,
    report_dir: &Path,
) -> Result<PipelineReport> {
    let overrides = overrides.map(read_overrides).transpose()?;
    let registry = default_registry(generator.clone())
        .await
        .context("Failed to register data sources")?;
    let pipeline = CalendarPipeline::new(registry, generator, config);

    let report = pipeline.run_pipeline(user, subject, overrides.as_ref()).await;
    let path = write_pipeline_report(&report, report_dir)
        .with_context(|| format!("Failed to write report under {:?}", report_dir))?;
    info!(run_id = %report.run_id, path = %path.display(), "report written");
    Ok(report)
}

fn cmd_show_report(run_id: &str, report_dir: &Path) -> Result<PipelineReport> {
    read_pipeline_report(run_id, report_dir)
        .with_context(|| format!("Failed to load run {} from {:?}", run_id, report_dir))
}

async fn cmd_registry_status(generator: Arc<dyn TextGenerator>, raw: bool) -> Result<()> {
    let registry = default_registry(generator).await?;
    let status = registry.get_registry_status().await;
    if raw {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Sources: {} ({} active)", status.total, status.active);
    for (source_type, count) in &status.by_type {
        println!("  {:<12} {}", source_type.to_string(), count);
    }
    println!();
    for id in &status.fetch_order {
        let Some(source) = status.sources.get(id) else {
            continue;
        };
        let deps = if source.dependencies.is_empty() {
            "-".to_string()
        } else {
            source.dependencies.join(", ")
        };
        println!(
            "{:<18} v{:<7} {:<8} quality {:.2}  deps: {}",
            id,
            source.version.to_string(),
            if source.active { "active" } else { "inactive" },
            source.quality_score,
            deps
        );
    }
    Ok(())
}

async fn cmd_validate_sources(generator: Arc<dyn TextGenerator>) -> Result<()> {
    let registry = default_registry(generator).await?;
    let results = registry.validate_all_sources().await;
    for (id, result) in &results {
        let verdict = if result.is_valid { "ok" } else { "INVALID" };
        println!("{:<18} {:<8} {:.2}", id, verdict, result.quality_score);
        for error in &result.errors {
            println!("    error: {}", error);
        }
        for field in &result.missing_fields {
            println!("    missing: {}", field);
        }
    }
    Ok(())
}

async fn cmd_evolution_status(generator: Arc<dyn TextGenerator>, raw: bool) -> Result<()> {
    let registry = default_registry(generator).await?;
    let manager = default_evolution_manager(registry).await;
    let status = manager.get_evolution_status().await;
    if raw {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    for id in &status.evolution_order {
        let Some(entry) = status.sources.get(id) else {
            continue;
        };
        println!(
            "{:<18} {} -> {}  {:?}  effort {}{}",
            id,
            entry.current_version,
            entry.target_version,
            entry.priority,
            entry.estimated_effort,
            if entry.ready { "  [ready]" } else { "" }
        );
    }
    println!("{} source(s) ready", status.ready_count);
    Ok(())
}

async fn cmd_evolve(
    generator: Arc<dyn TextGenerator>,
    source: Option<&str>,
    to: Option<&str>,
) -> Result<Vec<EvolutionRecord>> {
    let registry = default_registry(generator).await?;
    let manager = default_evolution_manager(registry).await;

    let Some(source) = source else {
        if to.is_some() {
            bail!("--to requires a source");
        }
        return Ok(manager.evolve_ready().await);
    };

    let target = match to {
        Some(raw) => Version::parse(raw).with_context(|| format!("Invalid version: {}", raw))?,
        None => manager
            .get_evolution_status()
            .await
            .sources
            .get(source)
            .map(|s| s.target_version.clone())
            .with_context(|| format!("No evolution plan for source '{}'", source))?,
    };
    let record = manager
        .evolve(source, target)
        .await
        .with_context(|| format!("Failed to evolve '{}'", source))?;
    Ok(vec![record])
}

fn render_report(report: &PipelineReport) -> String {
    let mut out = format!(
        "Run {}  user {}  subject {}\n",
        report.run_id, report.user_id, report.subject_id
    );
    for outcome in &report.steps {
        let mut line = format!(
            "  {} {:<32} {:<10} {:>6}ms",
            outcome.step,
            outcome.step.name(),
            outcome.status.as_str(),
            outcome.duration_ms
        );
        if let Some(quality) = &outcome.quality {
            line.push_str(&format!(
                "  gates {}/{} ({:.2})",
                quality.passed_gates, quality.total_gates, quality.overall_score
            ));
        }
        if !outcome.validation_passed && !outcome.missing_fields.is_empty() {
            line.push_str(&format!("  missing: {}", outcome.missing_fields.join(", ")));
        }
        if let Some(error) = &outcome.error {
            line.push_str(&format!("  ({})", error));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&format!(
        "Overall quality: {:.2}\nRecommendations: {}\n",
        report.overall_quality_score,
        report.final_recommendations.len()
    ));
    if !report.failed_gates.is_empty() {
        out.push_str(&format!("Failed gates: {}\n", report.failed_gates.join(", ")));
    }
    if report.succeeded() {
        out.push_str("Calendar assembled.");
    } else {
        let failed: Vec<&str> = report.failed_steps.iter().map(|s| s.key()).collect();
        out.push_str(&format!("Failed steps: {}", failed.join(", ")));
    }
    out
}

fn render_evolution(record: &EvolutionRecord) -> String {
    let mut out = format!(
        "{} {} -> {}: {:?}",
        record.source_id, record.from_version, record.to_version, record.status
    );
    for step in &record.steps {
        let mark = if step.success { "ok" } else { "FAILED" };
        out.push_str(&format!("\n  {:<32} {}", step.step, mark));
        if let Some(error) = &step.error {
            out.push_str(&format!(" ({})", error));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use calweave_core::{EvolutionStatus, StepStatus};
    use calweave_textgen::fakes::ScriptedGenerator;
    use serde_json::json;

    fn strategy_only() -> Arc<dyn TextGenerator> {
        Arc::new(
            ScriptedGenerator::new()
                .respond("source.", json!({ "fixture": true }))
                .respond(
                    "step_01",
                    json!({
                        "strategy_summary": "Own the zero trust conversation",
                        "business_goals": ["pipeline"],
                        "content_pillars": ["zero trust"],
                        "target_audience": "CISOs",
                    }),
                ),
        )
    }

    #[tokio::test]
    async fn test_cmd_run_writes_a_readable_report() {
        let temp_dir = tempfile::tempdir().unwrap();
        let overrides = temp_dir.path().join("overrides.json");
        std::fs::write(
            &overrides,
            r#"{"step_02": {"content_gaps": ["video"], "keyword_opportunities": ["zero trust"]}}"#,
        )
        .unwrap();
        let reports = temp_dir.path().join("runs");

        let report = cmd_run(
            strategy_only(),
            &CalweaveConfig::default(),
            "user-1",
            "strategy-1",
            Some(&overrides),
            &reports,
        )
        .await
        .unwrap();

        assert_eq!(report.steps[0].status, StepStatus::Completed);
        assert_eq!(report.steps[1].status, StepStatus::Overridden);
        assert_eq!(report.steps[2].status, StepStatus::Failed);
        assert!(!report.succeeded());

        let loaded = cmd_show_report(&report.run_id, &reports).unwrap();
        assert_eq!(loaded.run_id, report.run_id);
        let text = render_report(&loaded);
        assert!(text.contains("step_02"));
        assert!(text.contains("Failed steps: step_03"));
    }

    #[tokio::test]
    async fn test_cmd_run_rejects_malformed_overrides() {
        let temp_dir = tempfile::tempdir().unwrap();
        let overrides = temp_dir.path().join("overrides.json");
        std::fs::write(&overrides, "[1, 2, 3]").unwrap();

        let err = cmd_run(
            strategy_only(),
            &CalweaveConfig::default(),
            "u",
            "s",
            Some(&overrides),
            temp_dir.path(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Overrides must be a JSON object"));
    }

    #[tokio::test]
    async fn test_cmd_evolve_defaults_to_configured_target() {
        let records = cmd_evolve(strategy_only(), Some("keywords"), None)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].to_version, Version::new(2, 0, 0));
        assert_eq!(records[0].status, EvolutionStatus::Completed);
        assert!(render_evolution(&records[0]).starts_with("keywords 1.5.0 -> 2.0.0"));
    }

    #[tokio::test]
    async fn test_cmd_evolve_rejects_bad_input() {
        let err = cmd_evolve(strategy_only(), Some("keywords"), Some("two"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid version"));

        let err = cmd_evolve(strategy_only(), Some("ghost"), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No evolution plan"));

        assert!(cmd_evolve(strategy_only(), None, Some("3.0.0")).await.is_err());
    }

    #[tokio::test]
    async fn test_cmd_evolve_all_ready_sources() {
        let records = cmd_evolve(strategy_only(), None, None).await.unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].source_id, "content_strategy");
    }

    #[test]
    fn test_report_dir_precedence() {
        let mut config = CalweaveConfig::default();
        assert_eq!(report_dir_for(None, &config), PathBuf::from(DEFAULT_REPORT_DIR));
        config.report_dir = Some(PathBuf::from("/srv/reports"));
        assert_eq!(report_dir_for(None, &config), PathBuf::from("/srv/reports"));
        assert_eq!(
            report_dir_for(Some(PathBuf::from("here")), &config),
            PathBuf::from("here")
        );
    }

    #[test]
    fn test_cli_parses_run_command() {
        let cli = Cli::try_parse_from([
            "calweave", "--json", "run", "--user", "u1", "--subject", "s1", "--raw",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Run { user, subject, raw, .. } => {
                assert_eq!(user, "u1");
                assert_eq!(subject, "s1");
                assert!(raw);
            }
            _ => panic!("expected run"),
        }
    }
}
