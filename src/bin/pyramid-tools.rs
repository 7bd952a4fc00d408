use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context as _};
use clap::{Parser, Subcommand};
use pyramid_tools::cli::parse_params;
use pyramid_tools::{
    builtin_registry, descriptor_exports, load_context_file, tool_catalog, CredentialResolver,
    DynTransport, HttpTransport, LoggingConfig, ProviderSettings, ToolRegistry,
};
use serde_json::json;

#[derive(Parser)]
#[command(name = "pyramid-tools", version, about = "Agent tool wrappers CLI", author)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Tools {
        #[command(subcommand)]
        command: ToolsCommand,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ToolsCommand {
    /// List registered tools and whether settings can satisfy them.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print one tool's descriptor as JSON Schema.
    Describe { name: String },
    /// Export every descriptor.
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
        /// Indent the JSON; compact by default.
        #[arg(long)]
        pretty: bool,
    },
    /// Invoke a tool once.
    Run {
        name: String,
        #[arg(long, default_value = "{}")]
        params: String,
        /// JSON file holding the invocation context.
        #[arg(long)]
        context: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show which services have settings credentials. Never prints secrets.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoggingConfig::init();

    let cli = Cli::parse();
    let settings = Arc::new(ProviderSettings::from_env());
    match cli.command {
        Command::Tools { command } => {
            let registry = build_registry(&settings)?;
            match command {
                ToolsCommand::List { json } => handle_tools_list(&registry, &settings, json)?,
                ToolsCommand::Describe { name } => handle_tools_describe(&registry, &name)?,
                ToolsCommand::Export { output, pretty } => {
                    handle_tools_export(&registry, output, pretty)?
                }
                ToolsCommand::Run {
                    name,
                    params,
                    context,
                } => handle_tools_run(&registry, &name, &params, context).await?,
            }
        }
        Command::Config { command } => match command {
            ConfigCommand::Check => handle_config_check(&settings),
        },
    }
    Ok(())
}

fn build_registry(settings: &Arc<ProviderSettings>) -> anyhow::Result<ToolRegistry> {
    let resolver = CredentialResolver::new(Arc::clone(settings));
    let transport: DynTransport = Arc::new(HttpTransport::new()?);
    Ok(builtin_registry(&resolver, transport)?)
}

fn handle_tools_list(
    registry: &ToolRegistry,
    settings: &ProviderSettings,
    as_json: bool,
) -> anyhow::Result<()> {
    let catalog = tool_catalog(registry, settings);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }
    println!(
        "{:<28} {:<14} {:<11} {}",
        "Name", "Service", "Configured", "Description"
    );
    for entry in catalog {
        let configured = match (entry.requires_auth, entry.configured) {
            (false, _) => "public",
            (true, true) => "yes",
            (true, false) => "no",
        };
        println!(
            "{:<28} {:<14} {:<11} {}",
            entry.name, entry.service, configured, entry.description
        );
    }
    Ok(())
}

fn handle_tools_describe(registry: &ToolRegistry, name: &str) -> anyhow::Result<()> {
    let descriptor = registry
        .descriptor(name)
        .ok_or_else(|| anyhow!("tool `{name}` not registered"))?;
    println!("{}", serde_json::to_string_pretty(&descriptor.to_json())?);
    Ok(())
}

fn handle_tools_export(
    registry: &ToolRegistry,
    output: Option<PathBuf>,
    pretty: bool,
) -> anyhow::Result<()> {
    let value = json!(descriptor_exports(registry));
    let content = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };

    if let Some(path) = output {
        fs::write(&path, content)
            .with_context(|| format!("failed to write `{}`", path.display()))?;
        println!("Descriptors exported to `{}`", path.display());
    } else {
        println!("{content}");
    }
    Ok(())
}

async fn handle_tools_run(
    registry: &ToolRegistry,
    name: &str,
    params: &str,
    context: Option<PathBuf>,
) -> anyhow::Result<()> {
    let params = parse_params(params)?;
    let ctx = match context {
        Some(path) => Some(Arc::new(load_context_file(&path)?)),
        None => None,
    };

    match registry.invoke(name, params, ctx).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(err) => {
            let report = json!({
                "error": {
                    "kind": err.kind(),
                    "message": err.to_string(),
                    "retryable": err.is_retryable(),
                }
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Err(err.into())
        }
    }
}

fn handle_config_check(settings: &ProviderSettings) {
    println!("{:<14} {:<11} {:<30} {}", "Service", "Configured", "Fields", "Variables");
    for status in settings.status() {
        println!(
            "{:<14} {:<11} {:<30} {}",
            status.service,
            if status.configured { "yes" } else { "no" },
            status.fields.join(","),
            status.env_vars.join(",")
        );
    }
}
