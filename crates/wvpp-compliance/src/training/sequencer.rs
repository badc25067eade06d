use std::collections::HashMap;

use serde::Serialize;

use super::domain::{ModuleId, TrainingModule};
use super::progress::{ModuleStatus, TrainingProgress};

/// Catalog row shown to an employee, combining the module with their lock state.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleCatalogEntry {
    pub module: TrainingModule,
    pub status: ModuleStatus,
    pub status_label: &'static str,
    pub locked: bool,
    pub video_progress: u8,
    pub best_score: u8,
    pub attempts_used: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<u32>,
}

/// Project lock state over the active curriculum.
///
/// The first module by order is always unlocked; every later module unlocks only once the
/// module immediately before it is completed. Activity recorded on a locked module does not
/// unlock it.
pub fn project_lock_state(
    modules: &[TrainingModule],
    progress: &HashMap<ModuleId, TrainingProgress>,
) -> Vec<ModuleCatalogEntry> {
    let mut ordered: Vec<&TrainingModule> = modules.iter().filter(|m| m.is_active).collect();
    ordered.sort_by_key(|module| module.order);

    let mut previous_completed = true;
    ordered
        .into_iter()
        .map(|module| {
            let record = progress.get(&module.id);
            let status = record.map(|r| r.status).unwrap_or_default();
            let attempts_used = record.map(TrainingProgress::attempts_used).unwrap_or(0);
            let locked = !previous_completed;
            previous_completed = status == ModuleStatus::Completed;

            ModuleCatalogEntry {
                module: module.clone(),
                status,
                status_label: status.label(),
                locked,
                video_progress: record.map(|r| r.video_progress).unwrap_or(0),
                best_score: record.map(|r| r.best_score).unwrap_or(0),
                attempts_used,
                attempts_remaining: module.attempts_remaining(attempts_used),
            }
        })
        .collect()
}

/// Whether `module_id` is unlocked; `None` when it is not part of the active curriculum.
pub fn is_unlocked(
    modules: &[TrainingModule],
    progress: &HashMap<ModuleId, TrainingProgress>,
    module_id: &ModuleId,
) -> Option<bool> {
    project_lock_state(modules, progress)
        .into_iter()
        .find(|entry| &entry.module.id == module_id)
        .map(|entry| !entry.locked)
}
