//! FilterQL CLI
//!
//! A thin wrapper around the filterql library.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use filterql::Catalog;

#[derive(Parser)]
#[command(name = "filterql")]
#[command(about = "Compile filter expressions into query payloads")]
#[command(after_help = "\
EXAMPLES:
    # Compile only (variables stay as aliases)
    filterql \"age >= 18 and Q2.has_any([1, 2])\"

    # Resolve aliases into addresses using a catalog
    filterql --catalog vars.json \"valid(birthyear) and not Q2.has_all([1])\"

    # vars.json:
    #   {\"variables\": [
    #       {\"alias\": \"birthyear\", \"address\": \"https://.../variables/001/\"},
    #       {\"alias\": \"Q2\", \"address\": \"https://.../variables/002/\",
    #        \"subvariables\": [{\"alias\": \"Q2_1\", \"address\": \"https://.../subvariables/a/\"}]}
    #   ]}
")]
struct Args {
    /// Filter expression
    expression: String,

    /// JSON variable catalog used to resolve aliases into addresses
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Print the payload on a single line
    #[arg(long)]
    compact: bool,
}

fn load_catalog(path: &PathBuf) -> anyhow::Result<Catalog> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    let catalog: Catalog = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
    log::info!("Loaded {} variables from {}", catalog.len(), path.display());
    Ok(catalog)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let expr = match &args.catalog {
        Some(path) => {
            let catalog = load_catalog(path)?;
            filterql::compile_and_resolve(&args.expression, &catalog)?
        }
        None => filterql::compile(&args.expression)?,
    };

    let payload = if args.compact {
        serde_json::to_string(&expr)?
    } else {
        serde_json::to_string_pretty(&expr)?
    };
    println!("{payload}");
    Ok(())
}
