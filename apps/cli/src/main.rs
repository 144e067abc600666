//! `quarry`: inspect and try out search templates without the HTTP server.
//!
//! Usage:
//!   quarry check [--templates <dir>]
//!   quarry render /var/search/docs -u alice -p type=doc
//!   quarry search /var/search/docs -u alice -p type=doc

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;

use quarry_server::config::Config;
use quarry_server::logging;
use quarry_server::search::{Identity, TemplateStore};
use quarry_server::state::build_search_service;

#[derive(Parser, Debug)]
#[command(name = "quarry", version, about = "Quarry search template tooling")]
struct Cli {
    /// Template directory (defaults to `templates.directory` from the config)
    #[arg(long, global = true)]
    templates: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate every template
    Check,
    /// Print the query a template builds for a request
    Render(RequestArgs),
    /// Run a template against the configured backend and print the response
    Search(RequestArgs),
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Template path, e.g. /var/search/docs
    template: String,

    /// Caller id; omitted means anonymous
    #[arg(short, long)]
    user: Option<String>,

    /// Request parameter as key=value (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    if key.is_empty() {
        return Err(format!("empty parameter name in {raw:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_simple_logging();
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(directory) = cli.templates {
        config.templates.directory = directory;
    }
    tracing::debug!(
        templates = %config.templates.directory.display(),
        backend = ?config.backend.kind,
        "Configuration loaded"
    );

    match cli.command {
        Command::Check => check(&config),
        Command::Render(args) => render(&config, args),
        Command::Search(args) => search(&config, args).await,
    }
}

fn check(config: &Config) -> Result<()> {
    let store = TemplateStore::load_dir(
        &config.templates.directory,
        &config.search.search_path_prefix,
    )
    .with_context(|| {
        format!(
            "Templates in {} are invalid",
            config.templates.directory.display()
        )
    })?;

    for path in store.paths() {
        println!("{path}");
    }
    eprintln!(
        "{} template(s) OK in {}",
        store.len(),
        config.templates.directory.display()
    );
    Ok(())
}

fn identity(config: &Config, user: Option<&str>) -> Identity {
    let identity = Identity::classify(user, &config.search.admin_users);
    tracing::debug!(
        user = %identity.user_id(),
        admin = identity.is_admin(),
        "Running as"
    );
    identity
}

fn render(config: &Config, args: RequestArgs) -> Result<()> {
    let service = build_search_service(config)?;
    let identity = identity(config, args.user.as_deref());
    let prepared = service.prepare(&args.template, &args.params, &identity)?;

    let output = json!({
        "template": prepared.template.path(),
        "query": prepared.query,
        "paging": prepared.paging,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn search(config: &Config, args: RequestArgs) -> Result<()> {
    let service = build_search_service(config)?;
    let identity = identity(config, args.user.as_deref());
    let response = service
        .search(&args.template, &args.params, &identity)
        .await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
