use crate::utils;
use colored::Colorize;
use std::path::Path;

pub fn handle(config: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "Validating declarations...".blue());

    match utils::load_project(config) {
        Ok(project) => {
            utils::print_loaded_config_file(&project);
            println!("{}", "✓ Declarations are valid".green().bold());
            println!();
            println!("Summary:");
            println!("  Snapshots: {}", project.file.snapshots.len());
            for decl in &project.file.snapshots {
                let safe = if decl.safe_mode { ", safe" } else { "" };
                println!(
                    "    - {} ({}, {}{})",
                    decl.name.cyan(),
                    decl.source_id,
                    decl.mode,
                    safe
                );
            }

            let settings = &project.file.settings;
            println!(
                "  Create timeout: {}s",
                settings.create_timeout.as_secs()
            );
            println!(
                "  Delete errors: {}",
                if settings.ignore_delete_errors {
                    "ignored"
                } else {
                    "reported"
                }
            );
        }
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ Invalid declarations".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
