use crate::utils;
use colored::Colorize;
use snapflow_cloud::LifecycleState;
use std::path::Path;

pub async fn list(config: Option<&Path>) -> anyhow::Result<()> {
    let project = utils::load_project(config)?;
    let store = project.state_manager();
    let state = store.load().await?;

    if state.resources.is_empty() {
        println!("{}", "No tracked snapshots".dimmed());
        return Ok(());
    }

    println!(
        "{:<24} {:<38} {:<12} {:<10} {}",
        "NAME".bold(),
        "ID".bold(),
        "LIFECYCLE".bold(),
        "STATE".bold(),
        "SIZE".bold()
    );
    for (name, record) in &state.resources {
        let lifecycle = match record.lifecycle {
            LifecycleState::Realized => record.lifecycle.to_string().green(),
            LifecycleState::Failed => record.lifecycle.to_string().red(),
            _ => record.lifecycle.to_string().yellow(),
        };
        let (remote_state, size) = record
            .attributes
            .as_ref()
            .map(|a| (a.state.clone(), format!("{} GB", a.size_gb)))
            .unwrap_or_else(|| ("-".to_string(), "-".to_string()));

        println!(
            "{:<24} {:<38} {:<12} {:<10} {}",
            name.cyan(),
            record.id.as_deref().unwrap_or("-"),
            lifecycle,
            remote_state,
            size
        );
        if let Some(error) = &record.last_error {
            println!("  {} {}", "last error:".red(), error);
        }
    }

    Ok(())
}

pub async fn show(config: Option<&Path>, name: &str) -> anyhow::Result<()> {
    let project = utils::load_project(config)?;
    let state = project.state_manager().load().await?;

    let record = state
        .get_resource(name)
        .ok_or_else(|| anyhow::anyhow!("Snapshot '{}' is not tracked", name))?;

    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}
