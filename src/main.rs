//! cfconverge CLI entrypoint.
//!
//! This is the main entrypoint for the cfconverge command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cf_converge::cli::{Cli, Commands, KindArg, OutputFormatter};
use cf_converge::config::{
    ConfigDocument, ConfigParser, ConfigValidator, TargetConfig, find_config_file,
};
use cf_converge::diff::EntityKind;
use cf_converge::error::{CfConvergeError, ConfigError, Result};
use cf_converge::platform::{CfClient, Platform};
use cf_converge::reconciler::{APPLY_ORDER, PlanReport, Reconciler};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// API version written by `get`.
const DOCUMENT_API_VERSION: &str = "1.0";

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Validate { warnings } => cmd_validate(config_path, warnings, &formatter),
        Commands::Diff { kind } => cmd_diff(config_path, kind, &formatter).await,
        Commands::Plan { kind } => cmd_plan(config_path, kind, &formatter).await,
        Commands::Apply { kind, yes } => cmd_apply(config_path, kind, yes, &formatter).await,
        Commands::Get => cmd_get(config_path, &formatter).await,
    }
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let parser = parser_for(&config_file);
    parser.load_dotenv()?;
    let document = parser.load_with_env(&config_file)?;

    let result = ConfigValidator::new().check(&document);
    print_result(&formatter.format_validation(&document, &result, show_warnings))?;

    match result.errors.first() {
        None => Ok(()),
        Some(first) => Err(CfConvergeError::Config(ConfigError::validation(
            first.message.clone(),
            first.field.clone(),
        ))),
    }
}

/// Show the changes between the live space and the document.
async fn cmd_diff(
    config_path: Option<&PathBuf>,
    kind: Option<KindArg>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let document = load_document(config_path)?;
    let client = connect(&document).await?;
    let reconciler = Reconciler::new(&client, &document.spec);

    let mut changes = Vec::new();
    for kind in selected_kinds(kind) {
        if let Some(kind_changes) = reconciler.diff(kind).await? {
            changes.push((kind, kind_changes));
        }
    }

    print_result(&formatter.format_changes(&changes))?;
    Ok(())
}

/// Show the remote calls that would converge the space.
async fn cmd_plan(
    config_path: Option<&PathBuf>,
    kind: Option<KindArg>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let document = load_document(config_path)?;
    let client = connect(&document).await?;
    let reconciler = Reconciler::new(&client, &document.spec);

    let plans = plan_selected(&reconciler, kind).await?;
    print_result(&formatter.format_plans(&plans))?;
    Ok(())
}

/// Converge the live space to the document.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    kind: Option<KindArg>,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let document = load_document(config_path)?;
    let client = connect(&document).await?;
    let reconciler = Reconciler::new(&client, &document.spec);

    if !auto_approve {
        let plans = plan_selected(&reconciler, kind).await?;
        if plans.iter().all(PlanReport::is_empty) {
            eprintln!("No changes to apply.");
            return Ok(());
        }
        eprintln!("{}", formatter.format_plans(&plans));

        eprint!("Do you want to apply this plan? [y/N]: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Apply cancelled.");
            return Ok(());
        }
    }

    let mut runs = Vec::new();
    for kind in selected_kinds(kind) {
        if let Some(report) = reconciler.apply(kind).await? {
            runs.push(report);
        }
    }

    print_result(&formatter.format_runs(&runs))?;
    Ok(())
}

/// Print the live space as a configuration document.
async fn cmd_get(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let document = load_document(config_path)?;
    let client = connect(&document).await?;
    let reconciler = Reconciler::new(&client, &document.spec);

    let live = reconciler.fetch_live().await?;
    let live_document = ConfigDocument {
        api_version: Some(String::from(DOCUMENT_API_VERSION)),
        target: document.target.clone(),
        spec: live.into_spec(),
    };

    print_result(&formatter.format_document(&live_document))?;
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Writes command output to stdout; logs and prompts stay on stderr.
fn print_result(text: &str) -> Result<()> {
    write_result(&mut std::io::stdout().lock(), text)
}

fn write_result<W: Write>(writer: &mut W, text: &str) -> Result<()> {
    writeln!(writer, "{text}")?;
    writer.flush()?;
    Ok(())
}

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Creates a parser rooted at the document's directory.
fn parser_for(config_file: &Path) -> ConfigParser {
    ConfigParser::new().with_base_path(config_file.parent().unwrap_or_else(|| Path::new(".")))
}

/// Loads and validates the configuration document.
fn load_document(config_path: Option<&PathBuf>) -> Result<ConfigDocument> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = parser_for(&config_file);
    parser.load_dotenv()?;

    let document = parser.load_with_env(&config_file)?;
    ConfigValidator::new().validate(&document)?;
    Ok(document)
}

/// Connects to the platform named by the document's target.
async fn connect(document: &ConfigDocument) -> Result<CfClient> {
    let target: &TargetConfig = document
        .target
        .as_ref()
        .ok_or(CfConvergeError::Config(ConfigError::MissingTarget))?;

    let token = ConfigParser::get_access_token()?;
    let client = CfClient::connect(target, &token).await?;
    info!(
        "Connected to {} space {}/{} ({})",
        client.backend_type(),
        target.organization,
        target.space,
        client.space_guid()
    );
    Ok(client)
}

/// Returns the kinds a command works on.
fn selected_kinds(kind: Option<KindArg>) -> Vec<EntityKind> {
    kind.map_or_else(|| APPLY_ORDER.to_vec(), |k| vec![EntityKind::from(k)])
}

/// Plans the selected kinds.
async fn plan_selected(
    reconciler: &Reconciler<'_, CfClient>,
    kind: Option<KindArg>,
) -> Result<Vec<PlanReport>> {
    match kind {
        None => reconciler.plan_all().await,
        Some(kind) => Ok(reconciler.plan(kind.into()).await?.into_iter().collect()),
    }
}
