use super::*;

use crate::catalogue::{Catalogue, TaskResult};

fn task(id: usize, name: &str, selected: bool) -> Task {
    Task {
        id,
        name: name.to_string(),
        description: format!("{name} description"),
        selected,
        done: false,
        success: false,
        log: String::new(),
        critical: false,
        parallel: true,
    }
}

fn three_tasks(selected: [bool; 3]) -> Session {
    Session::new(vec![
        task(0, "alpha", selected[0]),
        task(1, "beta", selected[1]),
        task(2, "gamma", selected[2]),
    ])
}

fn outcome(index: usize, success: bool, message: &str) -> TaskOutcome {
    TaskOutcome {
        index,
        result: TaskResult {
            success,
            message: message.to_string(),
        },
    }
}

fn running_session(selected: [bool; 3]) -> (Session, Vec<usize>) {
    let mut session = three_tasks(selected);
    session.advance();
    match session.start_run() {
        Command::StartRun(indices) => (session, indices),
        other => panic!("expected StartRun, got {other:?}"),
    }
}

fn warning_count(session: &Session) -> usize {
    session
        .logs()
        .iter()
        .filter(|line| line.starts_with("Warning"))
        .count()
}

#[test]
fn new_session_starts_in_selection_with_ready_log() {
    let session = Session::new(Catalogue::standard().all());
    assert_eq!(session.state(), SessionState::Selection);
    assert_eq!(session.cursor(), 0);
    assert_eq!(session.completed(), 0);
    assert_eq!(session.total_tasks(), 0);
    assert_eq!(session.logs().len(), 1);
    assert!(!session.exit_confirm());
    assert!(!session.should_quit());
    assert_eq!(session.progress(), 0.0);
}

#[test]
fn toggling_twice_restores_selection_for_every_index() {
    let mut session = Session::new(Catalogue::standard().all());
    let original: Vec<bool> = session.tasks().iter().map(|task| task.selected).collect();
    for _ in 0..session.tasks().len() {
        let idx = session.cursor();
        session.toggle();
        assert_ne!(session.tasks()[idx].selected, original[idx]);
        session.toggle();
        assert_eq!(session.tasks()[idx].selected, original[idx]);
        session.move_down();
    }
}

#[test]
fn space_and_enter_both_toggle_in_selection() {
    let mut session = three_tasks([false, false, false]);
    assert_eq!(session.handle_event(AppEvent::Toggle), Command::None);
    assert!(session.tasks()[0].selected);
    assert_eq!(session.handle_event(AppEvent::Confirm), Command::None);
    assert!(!session.tasks()[0].selected);
    assert_eq!(session.state(), SessionState::Selection);
}

#[test]
fn advance_with_nothing_selected_logs_one_warning_and_stays() {
    let mut session = three_tasks([false, false, false]);
    session.move_down();
    let warnings_before = warning_count(&session);
    let logs_before = session.logs().len();

    session.handle_event(AppEvent::Advance);

    assert_eq!(session.state(), SessionState::Selection);
    assert_eq!(session.cursor(), 1);
    assert_eq!(session.logs().len(), logs_before + 1);
    assert_eq!(warning_count(&session), warnings_before + 1);
}

#[test]
fn advance_with_selection_enters_confirmation_at_top() {
    let mut session = three_tasks([false, true, false]);
    session.move_down();
    session.move_down();
    session.handle_event(AppEvent::Advance);
    assert_eq!(session.state(), SessionState::Confirmation);
    assert_eq!(session.cursor(), 0);
}

#[test]
fn cursor_wraps_at_both_ends() {
    let mut session = three_tasks([true, true, true]);
    session.move_down();
    session.move_down();
    assert_eq!(session.cursor(), 2);
    session.handle_event(AppEvent::MoveDown);
    assert_eq!(session.cursor(), 0);
    session.handle_event(AppEvent::MoveUp);
    assert_eq!(session.cursor(), 2);
}

#[test]
fn cursor_moves_in_confirmation_but_toggle_is_inert() {
    let mut session = three_tasks([true, false, false]);
    session.advance();
    session.handle_event(AppEvent::MoveDown);
    assert_eq!(session.cursor(), 1);
    session.handle_event(AppEvent::Toggle);
    assert!(!session.tasks()[1].selected);
    assert_eq!(session.state(), SessionState::Confirmation);
}

#[test]
fn back_from_confirmation_returns_to_selection() {
    let mut session = three_tasks([true, false, true]);
    session.advance();
    session.move_down();
    assert_eq!(session.handle_event(AppEvent::Back), Command::None);
    assert_eq!(session.state(), SessionState::Selection);
    assert_eq!(session.cursor(), 0);
    assert!(!session.exit_confirm());
}

#[test]
fn start_resets_selected_tasks_and_leaves_others_untouched() {
    let mut session = three_tasks([true, false, true]);
    session.tasks[0].record(&TaskResult::ok("stale"));
    session.tasks[1].record(&TaskResult::failed("previous run"));
    session.advance();

    let command = session.handle_event(AppEvent::Confirm);

    assert_eq!(command, Command::StartRun(vec![0, 2]));
    assert_eq!(session.state(), SessionState::Running);
    assert_eq!(session.total_tasks(), 2);
    assert_eq!(session.completed(), 0);
    assert!(!session.tasks()[0].done);
    assert!(session.tasks()[0].log.is_empty());
    assert!(session.tasks()[1].done);
    assert_eq!(session.tasks()[1].log, "previous run");
}

#[test]
fn start_with_nothing_selected_aborts_back_to_selection() {
    let mut session = three_tasks([true, false, false]);
    session.advance();
    session.tasks[0].selected = false;

    assert_eq!(session.start_run(), Command::None);
    assert_eq!(session.state(), SessionState::Selection);
    assert_eq!(warning_count(&session), 1);
}

#[test]
fn scenario_two_of_three_tasks_reaches_summary() {
    let (mut session, indices) = running_session([true, false, true]);
    assert_eq!(indices, vec![0, 2]);
    assert_eq!(session.total_tasks(), 2);

    assert_eq!(
        session.apply_result(outcome(2, true, "done")),
        Command::AwaitResult
    );
    assert_eq!(session.completed(), 1);
    assert_eq!(session.state(), SessionState::Running);
    assert!((session.progress() - 0.5).abs() < f64::EPSILON);

    assert_eq!(session.apply_result(outcome(0, false, "fail")), Command::None);
    assert_eq!(session.completed(), 2);
    assert_eq!(session.state(), SessionState::Summary);
    assert_eq!(session.progress(), 1.0);

    let tasks = session.tasks();
    assert!(tasks[0].done);
    assert!(!tasks[0].success);
    assert_eq!(tasks[0].log, "fail");
    assert!(tasks[2].done);
    assert!(tasks[2].success);
    assert_eq!(tasks[2].log, "done");
    assert!(!tasks[1].done);
    assert_eq!(session.summary_counts(), (1, 1));
}

#[test]
fn completed_grows_by_one_per_result_and_never_exceeds_total() {
    let (mut session, indices) = running_session([true, true, true]);
    for (step, index) in indices.iter().rev().enumerate() {
        assert_eq!(session.state(), SessionState::Running);
        session.apply_result(outcome(*index, true, "ok"));
        assert_eq!(session.completed(), step + 1);
        assert!(session.completed() <= session.total_tasks());
        let expected = (step + 1) as f64 / 3.0;
        if session.state() == SessionState::Running {
            assert!((session.progress() - expected).abs() < 1e-9);
        }
    }
    assert_eq!(session.state(), SessionState::Summary);
    assert!(session.tasks().iter().all(|task| task.done));
}

#[test]
fn duplicate_and_foreign_results_are_not_counted() {
    let (mut session, _) = running_session([true, false, true]);
    session.apply_result(outcome(0, true, "first"));

    assert_eq!(
        session.apply_result(outcome(0, false, "again")),
        Command::AwaitResult
    );
    assert_eq!(session.apply_result(outcome(1, true, "unselected")), Command::AwaitResult);
    assert_eq!(session.apply_result(outcome(9, true, "unknown")), Command::AwaitResult);

    assert_eq!(session.completed(), 1);
    assert_eq!(session.tasks()[0].log, "first");
    assert!(!session.tasks()[1].done);
}

#[test]
fn results_outside_a_run_are_ignored() {
    let mut session = three_tasks([true, true, true]);
    assert_eq!(session.apply_result(outcome(0, true, "late")), Command::None);
    assert!(!session.tasks()[0].done);
    assert_eq!(session.completed(), 0);
}

#[test]
fn result_lines_are_appended_to_the_log() {
    let (mut session, _) = running_session([true, true, false]);
    session.apply_result(outcome(1, false, "access denied"));
    session.apply_result(outcome(0, true, "3 items purged"));
    let recent = session.recent_logs(2);
    assert_eq!(recent[0], "[ERR] beta: access denied");
    assert_eq!(recent[1], "[OK] alpha: 3 items purged");
}

#[test]
fn running_ignores_navigation_selection_and_back() {
    let (mut session, _) = running_session([true, true, false]);
    for event in [
        AppEvent::MoveDown,
        AppEvent::MoveUp,
        AppEvent::Toggle,
        AppEvent::Confirm,
        AppEvent::Advance,
        AppEvent::Back,
    ] {
        assert_eq!(session.handle_event(event), Command::None);
    }
    assert_eq!(session.state(), SessionState::Running);
    assert_eq!(session.cursor(), 0);
    assert!(session.tasks()[0].selected);
    assert!(!session.should_quit());
}

#[test]
fn force_quit_is_accepted_in_every_state() {
    let mut selection = three_tasks([true, false, false]);
    assert_eq!(selection.handle_event(AppEvent::ForceQuit), Command::Quit);
    assert!(selection.should_quit());

    let (mut running, _) = running_session([true, false, false]);
    assert_eq!(running.handle_event(AppEvent::ForceQuit), Command::Quit);
    assert!(running.should_quit());
}

#[test]
fn summary_acknowledge_returns_to_selection_with_cursor_reset() {
    let (mut session, _) = running_session([false, true, false]);
    session.apply_result(outcome(1, true, "ok"));
    assert_eq!(session.state(), SessionState::Summary);

    session.handle_event(AppEvent::Confirm);
    assert_eq!(session.state(), SessionState::Selection);
    assert_eq!(session.cursor(), 0);
}

#[test]
fn escape_from_summary_also_returns_to_selection() {
    let (mut session, _) = running_session([true, false, false]);
    session.apply_result(outcome(0, true, "ok"));
    session.handle_event(AppEvent::Back);
    assert_eq!(session.state(), SessionState::Selection);
    assert!(!session.should_quit());
}

#[test]
fn back_twice_in_selection_quits() {
    let mut session = three_tasks([true, false, false]);
    assert_eq!(session.handle_event(AppEvent::Back), Command::None);
    assert!(session.exit_confirm());
    assert!(!session.should_quit());
    assert_eq!(session.handle_event(AppEvent::Back), Command::Quit);
    assert!(session.should_quit());
}

#[test]
fn other_input_disarms_exit_confirmation() {
    let mut session = three_tasks([true, false, false]);
    session.handle_event(AppEvent::Back);
    session.handle_event(AppEvent::MoveDown);
    assert!(!session.exit_confirm());
    session.handle_event(AppEvent::Back);
    assert!(session.exit_confirm());
    assert!(!session.should_quit());
}

#[test]
fn ticks_do_not_disarm_exit_confirmation() {
    let mut session = three_tasks([true, false, false]);
    session.handle_event(AppEvent::Back);
    session.handle_event(AppEvent::Tick);
    session.handle_event(AppEvent::Tick);
    assert!(session.exit_confirm());
    assert_eq!(session.ticks, 2);
}

#[test]
fn a_second_run_starts_from_a_clean_slate() {
    let (mut session, _) = running_session([true, true, false]);
    session.apply_result(outcome(0, false, "fail"));
    session.apply_result(outcome(1, true, "ok"));
    session.acknowledge();
    session.advance();

    assert_eq!(session.start_run(), Command::StartRun(vec![0, 1]));
    assert_eq!(session.completed(), 0);
    assert_eq!(session.active_count(), 2);
    assert!(session.tasks().iter().all(|task| !task.done));
}

#[test]
fn log_is_bounded() {
    let mut session = three_tasks([false, false, false]);
    for _ in 0..(MAX_LOG_LINES + 25) {
        session.advance();
    }
    assert_eq!(session.logs().len(), MAX_LOG_LINES);
    assert!(session.logs().iter().all(|line| line == SELECT_AT_LEAST_ONE));
}
