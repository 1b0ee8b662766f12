mod compose_cmd;
mod config;
mod prompts_cmd;
mod serve_cmd;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use weaver_core::Composer;
use weaver_core::assemble::TemplateStrategy;
use weaver_core::completion::{Completion, OpenAiCompletion, OpenAiConfig};

use config::{CliOverrides, WeaverConfig};

#[derive(Parser)]
#[command(
    name = "weaver",
    about = "Compose tables, lists, formatted text and flow charts from natural-language requests"
)]
struct Cli {
    /// Completion model name (overrides OPENAI_MODEL env var)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a weaver config file
    Init {
        /// Base URL of the OpenAI-compatible API
        #[arg(long, default_value = OpenAiConfig::DEFAULT_BASE_URL)]
        base_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Compose one request and print the result
    Compose {
        /// The request text
        text: String,
        /// File holding the table from an earlier response, for cell edits
        #[arg(long)]
        last_table: Option<PathBuf>,
        /// Print the response envelope as JSON instead of the rendered document
        #[arg(long)]
        json: bool,
        /// Ask the model for a narrative template around the artifacts
        #[arg(long)]
        generative_template: bool,
    },
    /// Serve the compose and chat HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8001)]
        port: u16,
    },
    /// List instruction templates, or print one
    Prompts {
        /// Template name (e.g. guardrail, table, final_template)
        name: Option<String>,
    },
}

/// Execute the `weaver init` command: write config file.
fn cmd_init(model: Option<&str>, base_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let model = model.unwrap_or(OpenAiConfig::DEFAULT_MODEL);
    let cfg = config::ConfigFile {
        completion: config::CompletionSection {
            model: Some(model.to_string()),
            base_url: Some(base_url.to_string()),
            ..Default::default()
        },
        compose: config::ComposeSection {
            template: Some(TemplateStrategy::Deterministic),
            prompts_dir: None,
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  completion.model = {model}");
    println!("  completion.base_url = {base_url}");
    println!("  compose.template = deterministic");
    println!();
    println!("Next: export OPENAI_API_KEY (or set completion.api_key in the file).");

    Ok(())
}

/// Build the completion client and composer from resolved configuration.
pub fn build_composer(resolved: &WeaverConfig) -> anyhow::Result<(Composer, Arc<dyn Completion>)> {
    let prompts = resolved.prompt_library()?;
    let completion: Arc<dyn Completion> = Arc::new(
        OpenAiCompletion::new(resolved.completion.clone())
            .context("failed to create completion client")?,
    );
    if resolved.completion.api_key.is_none() {
        tracing::warn!("no API key configured; every request will report the service unavailable");
    }
    let composer = Composer::new(completion.clone(), Arc::new(prompts)).with_strategy(resolved.template);
    Ok((composer, completion))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { base_url, force } => {
            cmd_init(cli.model.as_deref(), &base_url, force)?;
        }
        Commands::Compose {
            text,
            last_table,
            json,
            generative_template,
        } => {
            let overrides = CliOverrides {
                model: cli.model,
                template: generative_template.then_some(TemplateStrategy::Generative),
            };
            let resolved = WeaverConfig::resolve(&overrides)?;
            let (composer, _) = build_composer(&resolved)?;
            let options = compose_cmd::ComposeOptions {
                last_table,
                json,
            };
            compose_cmd::run_compose(&composer, &text, &options).await?;
        }
        Commands::Serve { bind, port } => {
            let overrides = CliOverrides {
                model: cli.model,
                template: None,
            };
            let resolved = WeaverConfig::resolve(&overrides)?;
            let (composer, completion) = build_composer(&resolved)?;
            tracing::info!(
                model = completion.model_name(),
                template = %composer.strategy(),
                "compose engine ready"
            );
            serve_cmd::run_serve(serve_cmd::AppState::new(composer, completion), &bind, port).await?;
        }
        Commands::Prompts { name } => {
            let resolved = WeaverConfig::resolve(&CliOverrides::default())?;
            let prompts = resolved.prompt_library()?;
            prompts_cmd::run_prompts(&prompts, name.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test_util {
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that touch process environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }
}
