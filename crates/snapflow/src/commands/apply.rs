use crate::utils;
use colored::Colorize;
use snapflow_cloud::Plan;
use std::path::Path;

pub async fn handle(config: Option<&Path>, yes: bool) -> anyhow::Result<()> {
    println!("{}", "Applying declarations...".blue().bold());

    let project = utils::load_project(config)?;
    utils::print_loaded_config_file(&project);

    let store = project.state_manager();
    let plan = Plan::build(&project.file.snapshots, &store.load().await?);

    println!();
    utils::print_plan(&plan);
    if plan.actions.is_empty() {
        return Ok(());
    }

    if !yes {
        println!();
        if plan.has_changes {
            println!(
                "{}",
                "Warning: replaced and deleted snapshots are removed from the provider.".yellow()
            );
        }
        println!("Pass --yes to execute");
        return Ok(());
    }

    let reconciler = utils::build_reconciler(&project.file.settings)?;

    let lock = store.acquire_lock().await?;
    // reload under the lock; another run may have written since planning
    let mut state = store.load().await?;
    let plan = Plan::build(&project.file.snapshots, &state);

    let result = snapflow_cloud::apply(&reconciler, &plan, &mut state, &store).await;
    lock.release().await?;

    if !utils::print_apply_result(&result?) {
        anyhow::bail!("apply finished with failures");
    }

    println!("{}", "✓ Apply complete".green().bold());
    Ok(())
}
