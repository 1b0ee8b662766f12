use std::path::PathBuf;

use anyhow::{Context, Result};

use weaver_core::{ComposeContext, Composer, Envelope};

/// Options for `weaver compose`.
#[derive(Debug, Default)]
pub struct ComposeOptions {
    pub last_table: Option<PathBuf>,
    pub json: bool,
}

/// Execute the `weaver compose` command: one request, printed to stdout.
pub async fn run_compose(composer: &Composer, text: &str, options: &ComposeOptions) -> Result<()> {
    let envelope = compose_once(composer, text, options).await?;
    println!("{}", format_envelope(&envelope, options.json)?);
    Ok(())
}

async fn compose_once(composer: &Composer, text: &str, options: &ComposeOptions) -> Result<Envelope> {
    let context = match &options.last_table {
        Some(path) => {
            let table = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read table from {}", path.display()))?;
            ComposeContext::with_last_table(table)
        }
        None => ComposeContext::default(),
    };
    Ok(composer.compose(text, &context).await)
}

fn format_envelope(envelope: &Envelope, json: bool) -> Result<String> {
    if json {
        serde_json::to_string_pretty(envelope).context("failed to serialize envelope")
    } else {
        Ok(envelope.render())
    }
}
