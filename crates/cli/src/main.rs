mod config;
mod confirm;
mod extensions;
mod local_config;
mod output;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use core_upgrader_core::{PresetConfirmations, UpgradeContext, UpgradeRunner, WizardStatus};
use core_upgrader_runtime_config::UpgraderConfig;
use core_upgrader_store::SqliteStore;
use core_upgrader_wizards::all_wizards;
use std::path::{Path, PathBuf};

use crate::config::Overrides;
use crate::confirm::TerminalConfirmations;
use crate::extensions::ComposerExtensions;
use crate::local_config::TomlLocalConfiguration;
use crate::output::{OutputFormat, StatusLine};

/// Exit status when the run finished but at least one wizard failed.
const EXIT_WIZARD_FAILURES: i32 = 2;

#[derive(Parser)]
#[command(
    name = "core-upgrader",
    version,
    about = "Run CMS upgrade wizards against a site database"
)]
struct Cli {
    /// Config file (default: ./core-upgrader.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database holding the site tables
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Log wizard progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List wizards that still need to run
    List {
        /// Include wizards that are not necessary
        #[arg(long)]
        all: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run wizards (all when no identifiers are given) and print the report
    Run {
        /// Wizard identifiers to run
        identifiers: Vec<String>,

        /// Grant the confirmation of a wizard (repeatable)
        #[arg(long = "confirm", value_name = "IDENTIFIER")]
        confirm: Vec<String>,

        /// Grant every confirmation
        #[arg(long)]
        confirm_all: bool,

        /// Ask on the terminal for confirmations not granted up front
        #[arg(long)]
        interactive: bool,

        /// Create missing tables and columns before checking prerequisites
        #[arg(long)]
        ensure_prerequisites: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration
    Config,
}

/// Collaborators backing one invocation.
struct Site {
    store: SqliteStore,
    extensions: ComposerExtensions,
    local_configuration: TomlLocalConfiguration,
}

impl Site {
    fn open(config: &UpgraderConfig) -> Result<Self> {
        let database = Path::new(&config.database.path);
        if !database.exists() {
            bail!("database not found at {}", database.display());
        }
        let store = SqliteStore::open_path(database)
            .with_context(|| format!("Failed to open database at {}", database.display()))?;
        let extensions = ComposerExtensions::from_settings(&config.extensions)?;
        let local_configuration =
            TomlLocalConfiguration::open(Path::new(&config.local_configuration.path))?;
        Ok(Self {
            store,
            extensions,
            local_configuration,
        })
    }

    fn context(&self) -> UpgradeContext<'_> {
        UpgradeContext::new(&self.store, &self.extensions, &self.local_configuration)
    }
}

fn run_list(config: &UpgraderConfig, all: bool, format: OutputFormat) -> Result<i32> {
    let site = Site::open(config)?;
    let confirmations = PresetConfirmations::default();
    let runner = UpgradeRunner::new(site.context(), &confirmations);
    let wizards = all_wizards();

    let statuses = runner.status(&wizards)?;
    let lines: Vec<StatusLine> = wizards
        .iter()
        .zip(&statuses)
        .filter(|(_, entry)| {
            all || matches!(entry.1, WizardStatus::Necessary | WizardStatus::Error(_))
        })
        .map(|(wizard, entry)| StatusLine::new(entry.0, wizard.title(), &entry.1))
        .collect();

    output::render_status(&lines, format, &mut std::io::stdout().lock())?;
    Ok(0)
}

fn run_wizards(config: &UpgraderConfig, identifiers: &[String], format: OutputFormat) -> Result<i32> {
    let site = Site::open(config)?;
    let preset = PresetConfirmations::new(config.runner.confirm.iter().cloned())
        .grant_all(config.runner.confirm_all);
    let confirmations = TerminalConfirmations::new(preset, config.runner.interactive);
    let runner = UpgradeRunner::new(site.context(), &confirmations)
        .ensure_prerequisites(config.runner.ensure_prerequisites);
    let wizards = all_wizards();

    let report = runner.run(&wizards, identifiers)?;
    output::render_report(&report, format, &mut std::io::stdout().lock())?;

    if report.has_failures() {
        return Ok(EXIT_WIZARD_FAILURES);
    }
    Ok(0)
}

fn dispatch(cli: Cli) -> Result<i32> {
    let mut loaded = config::load_config(cli.config.as_deref())?;
    let mut overrides = Overrides {
        database: cli.database,
        ..Overrides::default()
    };

    match cli.command {
        Commands::List { all, format } => {
            overrides.apply(&mut loaded.config);
            run_list(&loaded.config, all, format)
        }
        Commands::Run {
            identifiers,
            confirm,
            confirm_all,
            interactive,
            ensure_prerequisites,
            format,
        } => {
            overrides.confirm = confirm;
            overrides.confirm_all = confirm_all;
            overrides.interactive = interactive;
            overrides.ensure_prerequisites = ensure_prerequisites;
            overrides.apply(&mut loaded.config);
            run_wizards(&loaded.config, &identifiers, format)
        }
        Commands::Config => {
            overrides.apply(&mut loaded.config);
            config::show_config(&loaded)?;
            Ok(0)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match dispatch(cli) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
