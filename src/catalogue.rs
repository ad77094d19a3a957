use std::sync::Arc;
use std::time::Duration;

use crate::actions;
use crate::error::{OptimizerError, Result};
use crate::orchestrator::Job;

/// Outcome of one execution unit. Produced exactly once per invoked task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub success: bool,
    pub message: String,
}

impl TaskResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// An opaque maintenance operation backing one catalogue entry.
pub trait Action: Send + Sync {
    fn run(&self) -> TaskResult;
}

impl<F> Action for F
where
    F: Fn() -> TaskResult + Send + Sync,
{
    fn run(&self) -> TaskResult {
        self()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: usize,
    pub name: String,
    pub description: String,
    pub selected: bool,
    pub done: bool,
    pub success: bool,
    pub log: String,
    pub critical: bool,
    pub parallel: bool,
}

impl Task {
    pub fn reset_outcome(&mut self) {
        self.done = false;
        self.success = false;
        self.log.clear();
    }

    pub fn record(&mut self, result: &TaskResult) {
        self.done = true;
        self.success = result.success;
        self.log = result.message.clone();
    }
}

/// Static metadata for a catalogue entry. `selected` is the default selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub selected: bool,
    pub critical: bool,
    pub parallel: bool,
}

const TEMP_FILES: TaskSpec = TaskSpec {
    name: "Clean temporary files",
    description: "Fast purge of %TEMP% and %WINDIR%\\Temp",
    selected: true,
    critical: false,
    parallel: true,
};
const COMPONENT_STORE: TaskSpec = TaskSpec {
    name: "Clean WinSxS (DISM)",
    description: "Component store cleanup (heavy)",
    selected: true,
    critical: true,
    parallel: false,
};
const PREFETCH: TaskSpec = TaskSpec {
    name: "Clear RAM & Prefetch cache",
    description: "Bulk removal of prefetch traces",
    selected: true,
    critical: false,
    parallel: true,
};
const DEFRAG: TaskSpec = TaskSpec {
    name: "Defragment HDD",
    description: "Only runs on spinning disks (blocking)",
    selected: true,
    critical: false,
    parallel: false,
};
const NETWORK: TaskSpec = TaskSpec {
    name: "Reset TCP/IP stack",
    description: "Network commands run in parallel",
    selected: true,
    critical: false,
    parallel: true,
};
const UPDATE_CACHE: TaskSpec = TaskSpec {
    name: "Clean Windows Update cache",
    description: "Removes downloaded update payloads",
    selected: true,
    critical: true,
    parallel: true,
};
const TELEMETRY: TaskSpec = TaskSpec {
    name: "Disable telemetry",
    description: "Stops diagnostic tracking services",
    selected: false,
    critical: true,
    parallel: true,
};
const SYSTEM_FILES: TaskSpec = TaskSpec {
    name: "Verify system files (SFC)",
    description: "Quick integrity scan",
    selected: true,
    critical: false,
    parallel: true,
};

pub const STANDARD_SPECS: [TaskSpec; 8] = [
    TEMP_FILES,
    COMPONENT_STORE,
    PREFETCH,
    DEFRAG,
    NETWORK,
    UPDATE_CACHE,
    TELEMETRY,
    SYSTEM_FILES,
];

struct CatalogueEntry {
    task: Task,
    action: Arc<dyn Action>,
}

/// Fixed, ordered list of tasks, each bound to its execution unit at construction.
pub struct Catalogue {
    entries: Vec<CatalogueEntry>,
}

impl Catalogue {
    pub fn new(entries: Vec<(TaskSpec, Arc<dyn Action>)>) -> Self {
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(id, (spec, action))| CatalogueEntry {
                task: Task {
                    id,
                    name: spec.name.to_string(),
                    description: spec.description.to_string(),
                    selected: spec.selected,
                    done: false,
                    success: false,
                    log: String::new(),
                    critical: spec.critical,
                    parallel: spec.parallel,
                },
                action,
            })
            .collect();
        Self { entries }
    }

    pub fn standard() -> Self {
        let actions: [Arc<dyn Action>; 8] = [
            Arc::new(actions::CleanTempFiles),
            Arc::new(actions::CleanComponentStore),
            Arc::new(actions::ClearPrefetch),
            Arc::new(actions::DefragHdd),
            Arc::new(actions::ResetNetworkStack),
            Arc::new(actions::CleanUpdateCache),
            Arc::new(actions::DisableTelemetry),
            Arc::new(actions::VerifySystemFiles),
        ];
        Self::new(STANDARD_SPECS.into_iter().zip(actions).collect())
    }

    /// Same entries as [`Catalogue::standard`], backed by simulated units that
    /// only sleep. Heavy entries take noticeably longer than staggered ones.
    pub fn simulated() -> Self {
        Self::new(
            STANDARD_SPECS
                .into_iter()
                .enumerate()
                .map(|(idx, spec)| {
                    let base = if spec.parallel { 300 } else { 1500 };
                    let delay = Duration::from_millis(base + 120 * idx as u64);
                    let action: Arc<dyn Action> = Arc::new(actions::SimulatedAction::new(
                        delay,
                        format!("simulated in {} ms", delay.as_millis()),
                    ));
                    (spec, action)
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn all(&self) -> Vec<Task> {
        self.entries.iter().map(|entry| entry.task.clone()).collect()
    }

    pub fn action(&self, task_id: usize) -> Result<Arc<dyn Action>> {
        self.entries
            .get(task_id)
            .map(|entry| Arc::clone(&entry.action))
            .ok_or(OptimizerError::UnknownTask(task_id))
    }

    /// Runs one entry synchronously on the calling thread.
    #[allow(dead_code)]
    pub fn execute(&self, task_id: usize) -> Result<TaskResult> {
        Ok(self.action(task_id)?.run())
    }

    /// Resolves the execution unit for every requested task id.
    pub fn jobs_for(&self, task_ids: &[usize]) -> Result<Vec<Job>> {
        task_ids
            .iter()
            .map(|&id| {
                let entry = self.entries.get(id).ok_or(OptimizerError::UnknownTask(id))?;
                Ok(Job {
                    index: id,
                    name: entry.task.name.clone(),
                    parallel: entry.task.parallel,
                    action: Arc::clone(&entry.action),
                })
            })
            .collect()
    }
}
