use crate::utils;
use colored::Colorize;
use snapflow_cloud::{ActionType, Plan};
use std::path::Path;

pub async fn handle(config: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "Refreshing tracked snapshots...".blue().bold());

    let project = utils::load_project(config)?;
    utils::print_loaded_config_file(&project);

    let store = project.state_manager();
    let lock = store.acquire_lock().await?;
    let mut state = store.load().await?;

    let full = Plan::build(&project.file.snapshots, &state);
    let plan = Plan::new(
        full.actions_by_type(ActionType::Refresh)
            .into_iter()
            .cloned()
            .collect(),
    );

    if plan.actions.is_empty() {
        lock.release().await?;
        println!("{}", "Nothing tracked yet. Run `snapflow apply` first.".dimmed());
        return Ok(());
    }

    // the lock guard releases on drop if this fails
    let reconciler = utils::build_reconciler(&project.file.settings)?;

    let result = snapflow_cloud::apply(&reconciler, &plan, &mut state, &store).await;
    lock.release().await?;

    if !utils::print_apply_result(&result?) {
        anyhow::bail!("refresh finished with failures");
    }
    Ok(())
}
