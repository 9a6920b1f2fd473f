//! List command - show the built-in template registry.

use anyhow::Result;
use clap::Args;

use stamp_templates::BUILTIN_TEMPLATES;

#[derive(Args)]
pub struct ListArgs {
    /// Print names only
    #[arg(long)]
    pub names: bool,
}

pub async fn execute(args: ListArgs) -> Result<()> {
    if args.names {
        for template in BUILTIN_TEMPLATES {
            println!("{}", template.name);
        }
        return Ok(());
    }

    println!("Built-in templates:");
    for template in BUILTIN_TEMPLATES {
        println!("  {:<14} {}", template.name, template.description);
    }
    Ok(())
}
