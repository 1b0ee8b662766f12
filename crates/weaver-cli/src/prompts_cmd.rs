use anyhow::Result;

use weaver_core::prompts::{PromptLibrary, PromptName};

/// Execute the `weaver prompts` command: list templates or print one.
pub fn run_prompts(prompts: &PromptLibrary, name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => {
            let name: PromptName = name.parse()?;
            println!("{}", prompts.get(name));
        }
        None => print!("{}", format_listing(prompts)),
    }
    Ok(())
}

/// One line per template: its name and the first line of its text.
fn format_listing(prompts: &PromptLibrary) -> String {
    let width = PromptName::ALL
        .iter()
        .map(|n| n.as_str().len())
        .max()
        .unwrap_or(0);

    PromptName::ALL
        .iter()
        .map(|name| {
            let first_line = prompts.get(*name).lines().next().unwrap_or("").trim();
            format!("{:<width$}  {first_line}\n", name.as_str())
        })
        .collect()
}
