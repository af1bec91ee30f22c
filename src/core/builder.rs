use crate::config::{Config, ConfigLoader};
use crate::core::context::SeekContext;
use crate::core::error::{Error, Result};
use crate::core::outcome::BuildOutcome;
use crate::model::{RegistryView, TestRun};
use crate::registry::{DryRunRegistry, TestRegistry, create_registry_from_config};
use crate::report::{Report, ReportHistory};
use crate::seeker::{ResultSeeker, create_seeker_from_config};
use crate::steps::StepRunner;
use crate::workspace::{LocalWorkspace, RemoteWorkspace, Workspace};
use std::path::PathBuf;
use tracing::{info, warn};

/// Builder for creating and running a reconciliation.
pub struct ReconcilerBuilder {
    config: Option<Config>,
    base_dir: Option<PathBuf>,
    workspace: Option<Box<dyn Workspace>>,
    registry: Option<Box<dyn TestRegistry>>,
    seekers: Vec<Box<dyn ResultSeeker>>,
    dry_run: bool,
}

impl ReconcilerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: None,
            base_dir: None,
            workspace: None,
            registry: None,
            seekers: Vec::new(),
            dry_run: false,
        }
    }

    /// Set the configuration directly.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Load `testopia.toml` from the current directory, if present.
    pub fn from_default_config(self) -> Result<Self> {
        self.load_config(ConfigLoader::new())
    }

    /// Load configuration from a TOML file.
    pub fn from_config_file(self, path: impl Into<PathBuf>) -> Result<Self> {
        self.load_config(ConfigLoader::new().config_file(path))
    }

    /// Load configuration through a prepared loader.
    pub fn load_config(mut self, loader: ConfigLoader) -> Result<Self> {
        let (config, base_dir) = loader.load()?;
        self.config = Some(config);
        self.base_dir = Some(base_dir);
        Ok(self)
    }

    /// Set the directory the configured workspace path resolves against.
    pub fn workspace_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(path.into());
        self
    }

    /// Set a custom workspace implementation.
    pub fn workspace<W: Workspace + 'static>(mut self, workspace: W) -> Self {
        self.workspace = Some(Box::new(workspace));
        self
    }

    /// Set a custom registry implementation.
    pub fn registry<R: TestRegistry + 'static>(mut self, registry: R) -> Self {
        self.registry = Some(Box::new(registry));
        self
    }

    /// Add a seeker. Once any is added, configured seekers are ignored.
    pub fn seeker<S: ResultSeeker + 'static>(mut self, seeker: S) -> Self {
        self.seekers.push(Box::new(seeker));
        self
    }

    /// Read from the registry but never write to it.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    // --- Build and Execute ---

    /// Build the reconciler.
    pub fn build(self) -> Result<Reconciler> {
        let config = self.config.ok_or_else(|| Error::config("no configuration provided"))?;

        let base_dir = self.base_dir.ok_or_else(|| {
            Error::config("workspace root not set (call from_config_file or workspace_root)")
        })?;
        let workspace_root = config.workspace_root(&base_dir);

        // Create registry from the selected installation if not explicitly set
        let registry = match self.registry {
            Some(registry) => registry,
            None => create_registry_from_config(config.selected_installation()?)?,
        };
        let registry: Box<dyn TestRegistry> = if self.dry_run {
            Box::new(DryRunRegistry::new(registry))
        } else {
            registry
        };

        // Create workspace from config if not explicitly set
        let workspace = match self.workspace {
            Some(workspace) => workspace,
            None => create_workspace_from_config(&config, workspace_root.clone())?,
        };

        let seekers = if self.seekers.is_empty() {
            config
                .seekers
                .iter()
                .map(create_seeker_from_config)
                .collect::<Result<Vec<_>>>()?
        } else {
            self.seekers
        };

        let history = ReportHistory::new(config.history_dir(&workspace_root)).within_workspace(&workspace_root);
        let steps = StepRunner::new(workspace_root);

        Ok(Reconciler {
            config,
            registry,
            workspace,
            seekers,
            history,
            steps,
        })
    }

    /// Build and immediately run.
    pub fn run(self) -> Result<RunSummary> {
        let mut reconciler = self.build()?;
        reconciler.run()
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a finished reconciliation produced.
#[derive(Debug)]
pub struct RunSummary {
    pub outcome: BuildOutcome,
    pub report: Report,
    /// Report of the previous build, for deltas.
    pub previous: Option<Report>,
    pub run: TestRun,
    /// Final state of every automated case.
    pub view: RegistryView,
}

/// Drives one build: fetch the registry view, run steps and seekers, persist
/// the report.
pub struct Reconciler {
    config: Config,
    registry: Box<dyn TestRegistry>,
    workspace: Box<dyn Workspace>,
    seekers: Vec<Box<dyn ResultSeeker>>,
    history: ReportHistory,
    steps: StepRunner,
}

impl Reconciler {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn history(&self) -> &ReportHistory {
        &self.history
    }

    /// Names of the seekers, in run order.
    pub fn seeker_names(&self) -> Vec<&str> {
        self.seekers.iter().map(|s| s.name()).collect()
    }

    /// Run the full reconciliation.
    ///
    /// Installation, run-id and login problems abort with an `Err`. Anything
    /// recovered along the way only downgrades the outcome to unstable.
    pub fn run(&mut self) -> Result<RunSummary> {
        let installation = self.config.selected_installation()?;
        let run_id = self.config.require_run_id()?;

        info!(
            installation = %installation.name,
            registry = self.registry.name(),
            workspace = self.workspace.name(),
            "logging in to Testopia"
        );
        self.registry
            .login(&installation.username, &installation.password)
            .map_err(|e| match e {
                Error::Login(_) => e,
                other => Error::login(other.to_string()),
            })?;

        let run = self.registry.test_run(run_id)?;
        let cases = self.registry.test_cases_for_run(run_id)?;
        let mut view = RegistryView::from_run(&run, cases)?;
        info!(run_id, "found {} automated test case(s)", view.len());

        let mut outcome = BuildOutcome::Success;
        if !self.config.steps.is_empty() {
            outcome = self.steps.run_all(&self.config.steps, &view, &run);
        }

        let mut report = Report::new();
        {
            let mut ctx = SeekContext::new(&mut *self.registry, &*self.workspace, &mut report)
                .with_history(&self.history);
            for seeker in &self.seekers {
                info!(seeker = seeker.name(), pattern = seeker.include_pattern(), "seeking test results");
                if let Err(e) = seeker.seek(&mut view, &mut ctx) {
                    warn!(seeker = seeker.name(), "result seeker aborted: {e}");
                    ctx.mark_unstable();
                }
            }
            if ctx.outcome().is_unstable() {
                outcome = BuildOutcome::Unstable;
            }
        }

        report.set_counts(view.tally());

        let previous = self.history.load_previous();
        if let Err(e) = self.history.save(&report) {
            warn!(dir = %self.history.dir().display(), "failed to save report: {e}");
            outcome = BuildOutcome::Unstable;
        }

        info!(%outcome, "reconciliation finished");
        Ok(RunSummary {
            outcome,
            report,
            previous,
            run,
            view,
        })
    }
}

// --- Factory Functions ---

/// Create the workspace: remote when a command is configured, local otherwise.
fn create_workspace_from_config(config: &Config, root: PathBuf) -> Result<Box<dyn Workspace>> {
    match &config.remote {
        Some(remote) => Ok(Box::new(RemoteWorkspace::new(remote.command.clone())?)),
        None => Ok(Box::new(LocalWorkspace::new(root))),
    }
}
