//! Schema command - inspect form schemas.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use super::load_schema;

/// Arguments for the schema command.
#[derive(Args)]
pub struct SchemaArgs {
    #[command(subcommand)]
    command: SchemaCommand,
}

#[derive(Subcommand)]
enum SchemaCommand {
    /// Validate a schema file and list its fields
    Check {
        /// Schema file (JSON)
        file: PathBuf,
    },
}

pub async fn run(args: SchemaArgs) -> anyhow::Result<()> {
    match args.command {
        SchemaCommand::Check { file } => check_schema(&file),
    }
}

fn check_schema(file: &Path) -> anyhow::Result<()> {
    let schema = load_schema(file)?;

    for category in &schema.categories {
        println!("{} ({} fields)", style(&category.name).bold(), category.fields.len());
        for name in category.field_names() {
            println!("  - {}", name);
        }
    }

    let distinct = schema.all_field_names().len();
    println!();
    println!(
        "{} Schema is valid: {} categories, {} fields",
        style("✓").green(),
        schema.categories.len(),
        schema.field_count()
    );
    if distinct < schema.field_count() {
        println!(
            "{} {} repeated field names share one result across categories",
            style("ℹ").blue(),
            schema.field_count() - distinct
        );
    }

    Ok(())
}
