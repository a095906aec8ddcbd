//! easy-mcp: declarative MCP server over stdio
//!
//! Serves a small demonstration capability set: a directory listing
//! resource, a file template, a greeting tool inferred from its declaration,
//! a progress-reporting tool, a tool that reads other resources, a prompt
//! and a root.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use easy_mcp::capability::signature::{infer, parse_declaration, InferOverrides};
use easy_mcp::capability::tool::ToolBuilder;
use easy_mcp::capability::{
    CapabilityResult, HandlerError, Parameter, PromptDefinition, Registration, ResourceBody,
    ResourceDefinition, ResourceTemplateDefinition, RootDefinition, ToolDefinition,
};
use easy_mcp::config;
use easy_mcp::mcp::server::McpServer;
use easy_mcp::registry::Registries;

/// Declarative MCP server serving tools, resources and prompts over stdio.
#[derive(Parser, Debug)]
#[command(name = "easy-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber. stdout carries the protocol, so logs go to stderr.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

const GREET_DECLARATION: &str = r"
/**
 * Greets someone by name.
 * @param name Who to greet
 * @param greeting Word to greet with
 */
function greet(name: string, greeting?: string) {}
";

/// Builds the demonstration capability list.
fn demo_registrations() -> CapabilityResult<Vec<Registration>> {
    let desktop = ResourceDefinition::builder("dir://desktop")
        .name("Desktop directory")
        .description("Lists files on the desktop")
        .mime_type("text/uri-list")
        .handler(|| async { Ok("file://desktop/file1.txt\nfile://desktop/file2.txt") })
        .build()?;

    let files = ResourceTemplateDefinition::builder("file://{folder}/{filename}")
        .name("File")
        .description("Reads a file from a folder")
        .handler(|args| async move {
            let folder = args.str("folder").unwrap_or_default();
            let filename = args.str("filename").unwrap_or_default();
            Ok(format!("Contents of {filename} in {folder}"))
        })
        .build()?;

    let greet_signature = infer(&parse_declaration(GREET_DECLARATION)?, &InferOverrides::default())?;
    let greet = ToolBuilder::from_signature(&greet_signature)
        .handler(|args| async move {
            let name = args.str("name").unwrap_or("stranger");
            let greeting = args.str("greeting").unwrap_or("Hello");
            Ok(format!("{greeting}, {name}!"))
        })
        .build()?;

    let countdown = ToolDefinition::builder("countdown")
        .description("Counts down, reporting progress at each step")
        .param(Parameter::number("steps").description("Number of steps"))
        .handler_with_context(|args, ctx| async move {
            // Fractional and negative step counts are clamped to whole steps
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let steps = args.f64("steps").unwrap_or(3.0).max(0.0) as u32;
            for step in 1..=steps {
                tokio::time::sleep(Duration::from_millis(10)).await;
                if let Some(ctx) = &ctx {
                    ctx.report_progress(f64::from(step), Some(f64::from(steps)));
                }
            }
            Ok(json!({ "completed": steps }))
        })
        .build()?;

    let read_desktop = ToolDefinition::builder("read_desktop")
        .description("Reads every file listed on the desktop")
        .handler_with_context(|_, ctx| async move {
            let ctx = ctx.ok_or("execution context unavailable")?;
            let listing = ctx.read_resource("dir://desktop").await?;
            let mut contents = Vec::new();
            for uri in listing.as_text().unwrap_or_default().lines() {
                ctx.info(&format!("Reading {uri}"), Some("read_desktop"));
                if let ResourceBody::Text(text) = ctx.read_resource(uri).await? {
                    contents.push(text);
                }
            }
            Ok::<_, HandlerError>(contents)
        })
        .build()?;

    let hello = PromptDefinition::builder("hello_world")
        .description("Asks the model to greet someone")
        .argument(Parameter::string("name").description("Who to greet"))
        .handler(|args| async move {
            Ok(format!("Say hello to {}", args.str("name").unwrap_or("the world")))
        })
        .build()?;

    let desktop_root = RootDefinition::builder("file://desktop").name("Desktop").build()?;

    Ok(vec![
        desktop.into(),
        files.into(),
        greet.into(),
        countdown.into(),
        read_desktop.into(),
        hello.into(),
        desktop_root.into(),
    ])
}

/// Entry point for the easy-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig read from: {}", default_path.display());
                    eprintln!("See config/example-config.json for the format");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        name = %cfg.server.name,
        version = %cfg.server.version,
        "Starting easy-mcp server"
    );

    let mut registries = Registries::new(cfg.registration.on_duplicate);
    if let Err(e) = demo_registrations().and_then(|entries| registries.register_all(entries)) {
        error!(error = %e, "Capability registration failed");
        return ExitCode::FAILURE;
    }

    info!(
        tools = registries.tools.len(),
        resources = registries.resources.list_resources().len(),
        templates = registries.resources.list_templates().len(),
        prompts = registries.prompts.list().len(),
        roots = registries.roots.list().len(),
        "Capabilities registered"
    );

    let mut server = McpServer::stdio(cfg.server_info(), registries);

    info!("MCP server ready, waiting for client connection...");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn log_level_precedence() {
        assert_eq!(get_log_level(3, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(2, false, "error"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "info"), Level::INFO);
        assert_eq!(get_log_level(0, false, "bogus"), Level::WARN);
    }

    #[test]
    fn demo_capabilities_register() {
        let mut registries = Registries::default();
        registries.register_all(demo_registrations().unwrap()).unwrap();
        assert_eq!(registries.tools.len(), 3);
        assert_eq!(registries.roots.list()[0].uri, "file://desktop");
        let greet = registries.tools.get("greet").unwrap();
        assert_eq!(greet.description(), "Greets someone by name.");
        assert_eq!(greet.input_schema()["required"], json!(["name"]));
    }

    #[test]
    fn read_desktop_follows_listing() {
        use easy_mcp::mcp::context::{Context, Notifier};
        use serde_json::Map;

        let mut registries = Registries::default();
        registries.register_all(demo_registrations().unwrap()).unwrap();
        let (notifier, _rx) = Notifier::channel();
        let ctx = Context::new(notifier, registries.resources.clone(), None, serde_json::Value::Null);

        let result = tokio_test::block_on(registries.tools.call("read_desktop", Map::new(), Some(ctx))).unwrap();
        assert_eq!(
            result,
            json!([
                "Contents of file1.txt in desktop",
                "Contents of file2.txt in desktop"
            ])
        );
        assert_eq!(registries.resources.list_resources().len(), 3);
    }
}
