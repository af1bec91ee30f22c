use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::exit;
use testopia_sync::config::{ConfigLoader, SummaryFormat, env};
use testopia_sync::render::SummaryRenderer;
use testopia_sync::workspace::{self, LocalWorkspace};
use testopia_sync::{ReconcilerBuilder, Result, RunSummary};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Exit code for fatal errors (installation, login, configuration).
const EXIT_FATAL: i32 = 1;

#[derive(Debug, Parser)]
#[command(name = "testopia-sync", version, about = "Report JUnit, TestNG and TAP results to Testopia")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile the workspace's reports against the configured test run
    Run(RunOpts),
    /// Serve one collect request on stdin/stdout (remote workspace side)
    Collect {
        /// Workspace root to scan
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
    },
    /// List the files an include pattern matches
    Scan {
        /// Ant-style include pattern; several may be separated by commas
        pattern: String,
        /// Workspace root to scan
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
    },
    /// Load and print the effective configuration without contacting Testopia
    Check(ConfigOpts),
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Configuration file (default: testopia.toml in the current directory)
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Profile to apply on top of the configuration file
    #[arg(long, short)]
    profile: Option<String>,
}

impl ConfigOpts {
    fn loader(&self) -> ConfigLoader {
        let mut loader = ConfigLoader::new();
        if let Some(path) = &self.config {
            loader = loader.config_file(path);
        }
        if let Some(profile) = &self.profile {
            loader = loader.profile(profile);
        }
        loader
    }
}

#[derive(Debug, Args)]
struct RunOpts {
    #[command(flatten)]
    config: ConfigOpts,
    /// Read from Testopia but do not send any update
    #[arg(long)]
    dry_run: bool,
    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run(opts) => run(opts),
        Command::Collect { workspace } => {
            init_logging(false);
            collect(workspace).map(|()| 0)
        }
        Command::Scan { pattern, workspace } => {
            init_logging(false);
            scan(&workspace, &pattern).map(|()| 0)
        }
        Command::Check(opts) => {
            init_logging(false);
            check(&opts).map(|()| 0)
        }
    };

    match result {
        Ok(code) => exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            exit(EXIT_FATAL);
        }
    }
}

/// Install a stderr fmt layer filtered by `TESTOPIA_SYNC_LOG`.
fn init_logging(verbose: bool) {
    let targets = env::get_log_filter()
        .and_then(|filter| filter.parse::<Targets>().ok())
        .unwrap_or_else(|| {
            let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
            Targets::new().with_default(level)
        });

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(targets);

    tracing_subscriber::registry().with(layer).init();
}

fn run(opts: RunOpts) -> Result<i32> {
    let mut reconciler = ReconcilerBuilder::new()
        .load_config(opts.config.loader())?
        .dry_run(opts.dry_run)
        .build()?;
    let config = reconciler.config();
    init_logging(opts.verbose || config.verbose);

    let format = config.report.format;
    let colorize =
        format == SummaryFormat::Text && config.report.color.should_colorize(std::io::stdout().is_terminal());

    let summary = reconciler.run()?;
    print_summary(&summary, format, colorize);
    Ok(summary.outcome.exit_code())
}

fn print_summary(summary: &RunSummary, format: SummaryFormat, colorize: bool) {
    let mut renderer = SummaryRenderer::new(format);
    if colorize {
        renderer.colorize();
    }
    print!("{}", renderer.summary(&summary.report, summary.previous.as_ref()));
    if format == SummaryFormat::Html {
        println!();
    }
    print!("{}", renderer.details(&summary.report));
    if format == SummaryFormat::Html {
        println!();
    }
}

fn collect(root: PathBuf) -> Result<()> {
    let workspace = LocalWorkspace::new(root);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    workspace::serve(&workspace, stdin.lock(), stdout.lock())
}

fn scan(root: &std::path::Path, pattern: &str) -> Result<()> {
    for path in workspace::scan(root, pattern)? {
        println!("{path}");
    }
    Ok(())
}

fn check(opts: &ConfigOpts) -> Result<()> {
    let (config, base_dir) = opts.loader().load()?;
    let root = config.workspace_root(&base_dir);

    println!("Configuration OK");
    match config.selected_installation() {
        Ok(installation) => println!("  installation: {} ({})", installation.name, installation.url),
        Err(e) => println!("  installation: {e}"),
    }
    match config.run_id {
        Some(run_id) => println!("  run-id: {run_id}"),
        None => println!("  run-id: (not set)"),
    }
    println!("  workspace: {}", root.display());
    println!("  history: {}", config.history_dir(&root).display());
    if let Some(remote) = &config.remote {
        println!("  remote: {}", remote.command.join(" "));
    }

    if config.seekers.is_empty() {
        println!("  seekers: (none)");
    } else {
        println!("  seekers:");
        for seeker in &config.seekers {
            println!("    - {} {}", seeker.kind.tag(), seeker.include_pattern);
        }
    }

    if !config.steps.is_empty() {
        println!(
            "  steps: {} single, {} before, {} iterative, {} after",
            config.steps.single.len(),
            config.steps.before.len(),
            config.steps.iterative.len(),
            config.steps.after.len()
        );
    }

    let overrides = env::detect_active_overrides();
    if !overrides.is_empty() {
        println!("  env overrides:");
        for (key, value) in overrides {
            println!("    {key}={value}");
        }
    }
    Ok(())
}
