mod report;
mod verify;

use std::{
    io::{IsTerminal, Write},
    path::PathBuf,
};

use {
    clap::Parser,
    regcheck_config::VerifyConfig,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "regcheck",
    version,
    about = "regcheck - static verifier for a plugin registry"
)]
struct Cli {
    /// Repository root; relative paths resolve against it.
    #[arg(long, env = "REGCHECK_ROOT", default_value = ".")]
    root: PathBuf,

    /// Config file (defaults to `regcheck.toml` in the root, if present).
    #[arg(long, env = "REGCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Registry file (overrides config value).
    #[arg(long, env = "REGCHECK_REGISTRY")]
    registry: Option<PathBuf>,

    /// Plugins root directory (overrides config value).
    #[arg(long, env = "REGCHECK_PLUGINS_DIR")]
    plugins_dir: Option<PathBuf>,

    /// Registry schema asset (overrides config value).
    #[arg(long, env = "REGCHECK_SCHEMA")]
    schema: Option<PathBuf>,

    /// Program that evaluates embedded hook snippets (defaults to `jq`).
    #[arg(long, env = "REGCHECK_SNIPPET_EVALUATOR")]
    snippet_evaluator: Option<String>,

    /// Per-snippet evaluation timeout in milliseconds.
    #[arg(long, env = "REGCHECK_SNIPPET_TIMEOUT_MS")]
    snippet_timeout_ms: Option<u64>,

    /// Print a ready-to-paste registry entry for every unregistered plugin.
    #[arg(long)]
    fix: bool,

    /// Fail on warnings as well as errors.
    #[arg(long, env = "REGCHECK_STRICT")]
    strict: bool,

    /// Print the reference graph and the install order of declared requirements.
    #[arg(long)]
    deps: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

impl Cli {
    /// Flags and environment win over the config file.
    fn apply(&self, config: &mut VerifyConfig) {
        if let Some(registry) = &self.registry {
            config.registry = registry.clone();
        }
        if let Some(plugins_dir) = &self.plugins_dir {
            config.plugins_dir = plugins_dir.clone();
        }
        if let Some(schema) = &self.schema {
            config.schema = schema.clone();
        }
        if let Some(program) = &self.snippet_evaluator {
            config.evaluator.program = program.clone();
        }
        if let Some(timeout_ms) = self.snippet_timeout_ms {
            config.evaluator.timeout_ms = timeout_ms;
        }
        if self.strict {
            config.policy.strict = true;
        }
    }
}

/// Logs go to stderr; stdout carries only the report.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(std::io::stderr().is_terminal())
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let root = cli.root.canonicalize().unwrap_or_else(|_| cli.root.clone());
    let mut config = match &cli.config {
        Some(path) => regcheck_config::load_config(path)?,
        None => regcheck_config::discover_and_load(&root),
    };
    cli.apply(&mut config);

    let outcome = verify::run(&root, &config).await?;

    let options = report::Options {
        fix: cli.fix,
        deps: cli.deps,
        strict: config.policy.strict,
    };
    let palette = if std::io::stdout().is_terminal() {
        report::Palette::ANSI
    } else {
        report::Palette::PLAIN
    };
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(report::render(&outcome, &options, &palette).as_bytes())?;
    stdout.flush()?;

    if outcome.findings.is_failure(options.strict) {
        std::process::exit(1);
    }

    Ok(())
}
