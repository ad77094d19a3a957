use tracing::{debug, info, warn};

use crate::catalogue::Task;
use crate::events::AppEvent;
use crate::orchestrator::TaskOutcome;

const MAX_LOG_LINES: usize = 200;
const READY_MESSAGE: &str = "Engine ready. Maximum speed enabled.";
const SELECT_AT_LEAST_ONE: &str = "Warning: select at least one task.";
const SELECT_TASKS: &str = "Warning: select tasks before starting.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Selection,
    Confirmation,
    Running,
    Summary,
}

impl SessionState {
    pub fn tab_index(self) -> usize {
        match self {
            SessionState::Selection => 0,
            SessionState::Confirmation => 1,
            SessionState::Running => 2,
            SessionState::Summary => 3,
        }
    }
}

/// Side effect requested by a state transition; carried out by the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    None,
    Quit,
    /// Launch the listed catalogue indices, then wait for the first result.
    StartRun(Vec<usize>),
    /// Re-issue the wait for the next result of the active run.
    AwaitResult,
}

/// Single owner of all task state. Results from the orchestrator are applied
/// here one at a time.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    tasks: Vec<Task>,
    cursor: usize,
    completed: usize,
    total_tasks: usize,
    logs: Vec<String>,
    exit_confirm: bool,
    should_quit: bool,
    pub ticks: u64,
}

impl Session {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            state: SessionState::Selection,
            tasks,
            cursor: 0,
            completed: 0,
            total_tasks: 0,
            logs: vec![READY_MESSAGE.to_string()],
            exit_confirm: false,
            should_quit: false,
            ticks: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total_tasks(&self) -> usize {
        self.total_tasks
    }

    #[cfg(test)]
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn recent_logs(&self, count: usize) -> &[String] {
        let start = self.logs.len().saturating_sub(count);
        &self.logs[start..]
    }

    pub fn exit_confirm(&self) -> bool {
        self.exit_confirm
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn selected_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.selected).count()
    }

    /// Selected tasks of the current run that have not reported yet.
    pub fn active_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|task| task.selected && !task.done)
            .count()
    }

    /// `(succeeded, failed)` over the tasks finished in the last run.
    pub fn summary_counts(&self) -> (usize, usize) {
        self.tasks
            .iter()
            .filter(|task| task.selected && task.done)
            .fold((0, 0), |(ok, failed), task| {
                if task.success {
                    (ok + 1, failed)
                } else {
                    (ok, failed + 1)
                }
            })
    }

    pub fn progress(&self) -> f64 {
        if self.state == SessionState::Summary {
            return 1.0;
        }
        if self.total_tasks == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total_tasks as f64
    }

    pub fn on_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Command {
        match event {
            AppEvent::Tick => {
                self.on_tick();
                return Command::None;
            }
            AppEvent::ForceQuit => return self.force_quit(),
            AppEvent::Back => return self.back(),
            _ => self.exit_confirm = false,
        }

        match (self.state, event) {
            (SessionState::Selection | SessionState::Confirmation, AppEvent::MoveUp) => {
                self.move_up();
                Command::None
            }
            (SessionState::Selection | SessionState::Confirmation, AppEvent::MoveDown) => {
                self.move_down();
                Command::None
            }
            (SessionState::Selection, AppEvent::Toggle | AppEvent::Confirm) => {
                self.toggle();
                Command::None
            }
            (SessionState::Selection, AppEvent::Advance) => {
                self.advance();
                Command::None
            }
            (SessionState::Confirmation, AppEvent::Confirm) => self.start_run(),
            (SessionState::Summary, AppEvent::Toggle | AppEvent::Confirm) => {
                self.acknowledge();
                Command::None
            }
            _ => Command::None,
        }
    }

    pub fn force_quit(&mut self) -> Command {
        if self.state == SessionState::Running {
            warn!(
                pending = self.total_tasks.saturating_sub(self.completed),
                "forced quit during run"
            );
        }
        self.should_quit = true;
        Command::Quit
    }

    pub fn back(&mut self) -> Command {
        match self.state {
            SessionState::Selection => {
                if self.exit_confirm {
                    self.should_quit = true;
                    return Command::Quit;
                }
                self.exit_confirm = true;
            }
            SessionState::Confirmation | SessionState::Summary => {
                self.state = SessionState::Selection;
                self.cursor = 0;
            }
            SessionState::Running => {}
        }
        Command::None
    }

    pub fn move_up(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        self.cursor = if self.cursor == 0 {
            self.tasks.len() - 1
        } else {
            self.cursor - 1
        };
    }

    pub fn move_down(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        self.cursor = if self.cursor + 1 >= self.tasks.len() {
            0
        } else {
            self.cursor + 1
        };
    }

    pub fn toggle(&mut self) {
        if self.state != SessionState::Selection {
            return;
        }
        if let Some(task) = self.tasks.get_mut(self.cursor) {
            task.selected = !task.selected;
        }
    }

    pub fn advance(&mut self) {
        if self.state != SessionState::Selection {
            return;
        }
        if self.selected_count() == 0 {
            self.push_log(SELECT_AT_LEAST_ONE);
            return;
        }
        self.state = SessionState::Confirmation;
        self.cursor = 0;
    }

    /// Resets the outcome of every selected task and moves to `Running`.
    /// Returns the indices the orchestrator must launch.
    pub fn start_run(&mut self) -> Command {
        if self.state != SessionState::Confirmation {
            return Command::None;
        }
        self.completed = 0;
        let mut launch = Vec::new();
        for task in self.tasks.iter_mut().filter(|task| task.selected) {
            task.reset_outcome();
            launch.push(task.id);
        }
        self.total_tasks = launch.len();

        if self.total_tasks == 0 {
            self.state = SessionState::Selection;
            self.push_log(SELECT_TASKS);
            return Command::None;
        }

        self.state = SessionState::Running;
        self.push_log(format!("Running {} tasks in parallel...", self.total_tasks));
        info!(tasks = self.total_tasks, "run started");
        Command::StartRun(launch)
    }

    /// Applies one delivered result. Returns `AwaitResult` while results are
    /// still outstanding.
    pub fn apply_result(&mut self, outcome: TaskOutcome) -> Command {
        if self.state != SessionState::Running {
            debug!(index = outcome.index, "result outside of a run ignored");
            return Command::None;
        }
        let Some(task) = self
            .tasks
            .get_mut(outcome.index)
            .filter(|task| task.selected && !task.done)
        else {
            warn!(index = outcome.index, "unexpected result ignored");
            return Command::AwaitResult;
        };

        task.record(&outcome.result);
        let line = if outcome.result.success {
            format!("[OK] {}: {}", task.name, outcome.result.message)
        } else {
            format!("[ERR] {}: {}", task.name, outcome.result.message)
        };
        info!(
            task = %task.name,
            success = outcome.result.success,
            message = %outcome.result.message,
            "task completed"
        );
        self.completed += 1;
        self.push_log(line);

        if self.completed >= self.total_tasks {
            self.state = SessionState::Summary;
            let (ok, failed) = self.summary_counts();
            info!(ok, failed, "run finished");
            return Command::None;
        }
        Command::AwaitResult
    }

    pub fn acknowledge(&mut self) {
        if self.state != SessionState::Summary {
            return;
        }
        self.state = SessionState::Selection;
        self.cursor = 0;
    }

    fn push_log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
        if self.logs.len() > MAX_LOG_LINES {
            let overflow = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(..overflow);
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/session_tests.rs"]
mod tests;
