use colored::Colorize;
use snapflow_cloud::{ActionType, ApplyResult, Plan, Reconciler, StateManager};
use snapflow_cloud_civo::{CivoClient, CivoConfig};
use snapflow_config::{Settings, SnapshotFile};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loaded declaration file and the directory its state lives in
pub struct Project {
    pub file_path: PathBuf,
    pub root: PathBuf,
    pub file: SnapshotFile,
}

impl Project {
    pub fn state_manager(&self) -> StateManager {
        StateManager::new(&self.root)
    }
}

/// Locate and parse the declaration file
pub fn load_project(config: Option<&Path>) -> anyhow::Result<Project> {
    let file_path = match config {
        Some(path) => path.to_path_buf(),
        None => snapflow_config::find_snapshot_file()?,
    };

    let file = snapflow_config::load_snapshot_file(&file_path)?;
    let root = file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or(std::env::current_dir()?);

    Ok(Project {
        file_path,
        root,
        file,
    })
}

/// Build a Civo-backed reconciler from the environment and file settings
pub fn build_reconciler(settings: &Settings) -> anyhow::Result<Reconciler> {
    let mut config = CivoConfig::from_env()?;
    if let Some(region) = &settings.region {
        config.region = region.clone();
    }

    println!("Region: {}", config.region.cyan());
    let client = CivoClient::new(config)?;
    Ok(Reconciler::new(Arc::new(client), settings.reconciler_config()))
}

pub fn print_loaded_config_file(project: &Project) {
    println!(
        "📄 Declarations: {}",
        project.file_path.display().to_string().cyan()
    );
}

pub fn print_plan(plan: &Plan) {
    if plan.actions.is_empty() {
        println!("{}", "No snapshots declared or tracked.".dimmed());
        return;
    }

    for action in &plan.actions {
        let marker = match action.action_type {
            ActionType::Create => "+".green(),
            ActionType::Replace => "±".yellow(),
            ActionType::Delete => "-".red(),
            ActionType::Refresh => "~".dimmed(),
        };
        println!("  {} {}", marker, action.description);
    }
    println!();
    println!("{}", plan.summary().to_string().bold());
}

/// Print the outcome of an apply; returns false when any action failed
pub fn print_apply_result(result: &ApplyResult) -> bool {
    println!();
    for ok in &result.succeeded {
        println!("  ✓ {}", ok.message);
    }
    for failed in &result.failed {
        println!(
            "  ✗ {}: {}",
            failed.action_id.red(),
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!();
    println!(
        "{} succeeded, {} failed ({} ms)",
        result.succeeded.len(),
        result.failed.len(),
        result.duration_ms
    );
    result.is_success()
}
