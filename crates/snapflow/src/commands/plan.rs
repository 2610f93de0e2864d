use crate::utils;
use colored::Colorize;
use snapflow_cloud::Plan;
use std::path::Path;

pub async fn handle(config: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "Planning...".blue().bold());

    let project = utils::load_project(config)?;
    utils::print_loaded_config_file(&project);

    let state = project.state_manager().load().await?;
    let plan = Plan::build(&project.file.snapshots, &state);

    println!();
    utils::print_plan(&plan);
    Ok(())
}
