use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tool_registry::{
    default_catalog, RegistryResolver, ResolveRequest, ServerMode, Version,
};
use tracing::info;
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

#[derive(Parser, Debug)]
#[command(
    name = "osmcp-tools",
    version,
    about = "Resolve the OpenSearch MCP tool set and print it as JSON."
)]
struct Cli {
    /// YAML tool configuration file.
    #[arg(long, env = "OPENSEARCH_TOOL_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "OPENSEARCH_MCP_MODE", default_value = "single")]
    mode: ServerMode,

    /// Flat override, e.g. `--tool tool.ListIndexTool.name=Lister`. Repeatable.
    #[arg(long = "tool", value_name = "KEY=VALUE")]
    tools: Vec<String>,

    /// Version of the connected cluster. Omit when it cannot be discovered.
    #[arg(long, env = "OPENSEARCH_VERSION")]
    opensearch_version: Option<Version>,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

fn parse_overrides(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut overrides = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid --tool argument '{}', expected KEY=VALUE", pair);
        };
        overrides.insert(key.trim().to_string(), value.to_string());
    }
    Ok(overrides)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let mut request = ResolveRequest::new(cli.mode).with_overrides(parse_overrides(&cli.tools)?);
    if let Some(path) = &cli.config {
        request = request.with_config_path(path);
    }

    let resolver = RegistryResolver::from_env().with_version(cli.opensearch_version);
    let exposed = resolver
        .resolve(&default_catalog(), &request)
        .context("Failed to resolve tool registry")?;
    info!(
        "Resolved {} tool(s) in {} mode (allow_write: {})",
        exposed.len(),
        exposed.mode,
        exposed.allow_write
    );

    println!("{}", serde_json::to_string_pretty(&exposed)?);
    Ok(())
}
