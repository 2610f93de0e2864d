use crate::utils;
use colored::Colorize;
use snapflow_cloud::Plan;
use std::path::Path;

pub async fn handle(config: Option<&Path>, name: Option<String>, yes: bool) -> anyhow::Result<()> {
    println!("{}", "Destroying snapshots...".blue().bold());

    let project = utils::load_project(config)?;
    utils::print_loaded_config_file(&project);

    let store = project.state_manager();
    let state = store.load().await?;

    if let Some(ref target) = name
        && state.get_resource(target).is_none()
    {
        anyhow::bail!("Snapshot '{}' is not tracked in {}", target, store.state_path().display());
    }

    let plan = Plan::destroy(&state, name.as_deref());
    println!();
    utils::print_plan(&plan);
    if plan.actions.is_empty() {
        return Ok(());
    }

    if !yes {
        println!();
        println!(
            "{}",
            "Warning: snapshots are deleted from the provider and forgotten locally.".yellow()
        );
        println!("Pass --yes to execute");
        return Ok(());
    }

    let reconciler = utils::build_reconciler(&project.file.settings)?;

    let lock = store.acquire_lock().await?;
    let mut state = store.load().await?;
    let plan = Plan::destroy(&state, name.as_deref());

    let result = snapflow_cloud::apply(&reconciler, &plan, &mut state, &store).await;
    lock.release().await?;

    if !utils::print_apply_result(&result?) {
        anyhow::bail!("destroy finished with failures");
    }

    println!("{}", "✓ Destroy complete".green().bold());
    Ok(())
}
