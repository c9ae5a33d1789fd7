use colored::Colorize;
use fsm_catalog::{Catalog, CatalogSummary};
use miette::Result;

use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::load_settings;

pub struct GenerateModListArgs {
    pub config_path: Option<String>,
}

pub fn generate_mod_list(args: GenerateModListArgs) -> Result<()> {
    let (settings, config_path) = load_settings(args.config_path.as_deref())?;
    tracing::debug!("Loaded configuration from {}", config_path);

    println_pad!(
        "{} {}",
        "🚜 Cataloging mods in:".bright_blue().bold(),
        settings.vault_dir.as_str().bright_cyan().bold()
    );

    let catalog = Catalog::new(settings);
    let summary = catalog.generate().map_err(CliError::from)?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &CatalogSummary) {
    println_pad!(
        "{} {} ({} installed)",
        "✓ Mods listed:".bright_green().bold(),
        summary.processed.to_string().bright_white().bold(),
        summary.installed
    );

    if summary.skipped.is_empty() {
        println_pad!("{} 0", "Skipped:".bright_white());
    } else {
        println_pad!(
            "{} {}",
            "⚠ Skipped:".bright_yellow().bold(),
            summary.skipped.len().to_string().bright_yellow()
        );
        for skipped in &summary.skipped {
            println_pad!(
                "   {} {} {}",
                "•".bright_yellow(),
                skipped.path.file_name().unwrap_or(skipped.path.as_str()),
                format!("({})", skipped.reason).dimmed()
            );
        }
    }

    println_pad!(
        "{} {}",
        "📝 Written to:".bright_magenta().bold(),
        summary.output_path.as_str().bright_white()
    );
}
