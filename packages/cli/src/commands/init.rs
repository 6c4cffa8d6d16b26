use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Also write an example page
    #[arg(short, long)]
    pub example: bool,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

const EXAMPLE_PAGE: &str = r#"<div v-scope="{ count: 0 }">
  <p>{{ count }}</p>
  <button @click="count++">Increment</button>
</div>
"#;

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Petal project...".bright_blue().bold());

    let config_json = serde_json::to_string_pretty(&Config::default())?;
    fs::write(&config_path, config_json)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    if args.example {
        let example_file = PathBuf::from(cwd).join("index.html");
        if example_file.exists() {
            println!("  {} Kept existing index.html", "•".dimmed());
        } else {
            fs::write(&example_file, EXAMPLE_PAGE)?;
            println!("  {} Created index.html", "✓".green());
        }
    }

    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: petal check .");
    println!(
        "  2. Run: petal render index.html --steps '[{{\"dispatch\":{{\"selector\":\"button\",\"event\":\"click\"}}}}]'"
    );

    Ok(())
}
