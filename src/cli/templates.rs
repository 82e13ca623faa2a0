//! CLI entry-point for inspecting prompt templates.

use anyhow::Result;
use clap::Args as ClapArgs;

use crate::prompts;

/// Args for the `templates` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Print the full text of one template.
    #[arg(long, value_name = "ID")]
    pub show: Option<String>,
}

pub fn run(args: Args) -> Result<()> {
    if let Some(name) = args.show {
        let template = prompts::lookup(&name)?;
        println!("{}", template.text);
        return Ok(());
    }
    for template in prompts::all() {
        println!(
            "{:<16} {:<9} {}",
            template.id,
            format!("{:?}", template.locale),
            template.placeholders.join(", ")
        );
    }
    Ok(())
}
