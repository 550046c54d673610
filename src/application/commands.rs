use crate::application::bootstrap::bootstrap_workspace;
use crate::application::task_service::TaskService;
use crate::application::timer_runtime::{TimerRuntime, TimerSnapshot};
use crate::domain::models::{Task, TaskStatus, TimerConfig};
use crate::domain::reports::{shift_reference, summarize, RangeType, ReportSummary};
use crate::infrastructure::config::{load_timer_config, load_timezone, persist_timer_config};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::notifier::{Notifier, NullNotifier};
use crate::infrastructure::task_repository::SqliteTaskRepository;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Append-only JSONL log shared by the command layer and the countdown
/// loop.
pub struct CommandLog {
    logs_dir: PathBuf,
    guard: Mutex<()>,
}

impl CommandLog {
    pub fn new(logs_dir: PathBuf) -> Self {
        Self {
            logs_dir,
            guard: Mutex::new(()),
        }
    }

    pub fn info(&self, command: &str, message: &str) {
        self.append("info", command, message);
    }

    pub fn error(&self, command: &str, message: &str) {
        self.append("error", command, message);
    }

    fn append(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

pub struct AppState<N: Notifier + 'static = NullNotifier> {
    config_dir: PathBuf,
    database_path: PathBuf,
    log: Arc<CommandLog>,
    tasks: Arc<TaskService<SqliteTaskRepository>>,
    timer: TimerRuntime<SqliteTaskRepository, N>,
    notifier: Arc<N>,
    timezone: Tz,
}

impl AppState<NullNotifier> {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        Self::with_notifier(workspace_root, Arc::new(NullNotifier))
    }
}

impl<N: Notifier + 'static> AppState<N> {
    pub fn with_notifier(workspace_root: PathBuf, notifier: Arc<N>) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config_dir = workspace_root.join("config");
        let logs_dir = workspace_root.join("logs");

        let log = Arc::new(CommandLog::new(logs_dir));
        let tasks = Arc::new(TaskService::new(Arc::new(SqliteTaskRepository::new(
            &bootstrap.database_path,
        ))));
        let timer = TimerRuntime::new(
            load_timer_config(&config_dir),
            Arc::clone(&tasks),
            Arc::clone(&notifier),
            Arc::clone(&log),
        );
        let timezone = load_timezone(&config_dir);

        Ok(Self {
            config_dir,
            database_path: bootstrap.database_path,
            log,
            tasks,
            timer,
            notifier,
            timezone,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn tasks(&self) -> &Arc<TaskService<SqliteTaskRepository>> {
        &self.tasks
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log.error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.log.info(command, message);
    }
}

/// One-time startup hook: ask the platform for notification permission.
/// Denial or delivery failure never blocks the core.
pub async fn init_notifications_impl<N: Notifier + 'static>(state: &AppState<N>) {
    if state.notifier.request_permission().await.is_err() {
        state.log.error("init_notifications", "permission request failed");
        return;
    }
    state.log.info("init_notifications", "notification permission requested");
}

pub fn create_task_impl<N: Notifier + 'static>(
    state: &AppState<N>,
    title: String,
    description: Option<String>,
    estimated_hours: f64,
) -> Result<Task, InfraError> {
    let task = state
        .tasks
        .create_task(&title, description.as_deref(), estimated_hours)?;
    state.log.info("create_task", &format!("created task_id={}", task.id));
    Ok(task)
}

pub fn list_tasks_impl<N: Notifier + 'static>(state: &AppState<N>) -> Result<Vec<Task>, InfraError> {
    state.tasks.list_tasks()
}

pub fn set_task_status_impl<N: Notifier + 'static>(
    state: &AppState<N>,
    task_id: i64,
    status: String,
) -> Result<Task, InfraError> {
    let status = TaskStatus::parse(&status).map_err(InfraError::InvalidInput)?;
    let task = state.tasks.set_task_status(task_id, status)?;
    state.log.info(
        "set_task_status",
        &format!("task_id={} status={}", task_id, task.status.as_str()),
    );
    Ok(task)
}

pub fn toggle_task_status_impl<N: Notifier + 'static>(
    state: &AppState<N>,
    task_id: i64,
) -> Result<Task, InfraError> {
    let task = state.tasks.toggle_task_status(task_id)?;
    state.log.info(
        "toggle_task_status",
        &format!("task_id={} status={}", task_id, task.status.as_str()),
    );
    Ok(task)
}

pub fn delete_task_impl<N: Notifier + 'static>(
    state: &AppState<N>,
    task_id: i64,
) -> Result<bool, InfraError> {
    let removed = state.tasks.delete_task(task_id)?;
    if removed {
        state.timer.on_task_deleted(task_id)?;
        state.log.info("delete_task", &format!("deleted task_id={}", task_id));
    }
    Ok(removed)
}

pub fn select_timer_task_impl<N: Notifier + 'static>(
    state: &AppState<N>,
    task_id: i64,
) -> Result<TimerSnapshot, InfraError> {
    let snapshot = state.timer.select_task(task_id)?;
    state.log.info("select_timer_task", &format!("task_id={}", task_id));
    Ok(snapshot)
}

pub fn start_timer_impl<N: Notifier + 'static>(
    state: &AppState<N>,
) -> Result<TimerSnapshot, InfraError> {
    let snapshot = state.timer.start()?;
    state.log.info("start_timer", &format!("run_state={}", snapshot.run_state));
    Ok(snapshot)
}

pub fn pause_timer_impl<N: Notifier + 'static>(
    state: &AppState<N>,
) -> Result<TimerSnapshot, InfraError> {
    let snapshot = state.timer.pause()?;
    state.log.info("pause_timer", &format!("run_state={}", snapshot.run_state));
    Ok(snapshot)
}

pub fn reset_timer_impl<N: Notifier + 'static>(
    state: &AppState<N>,
) -> Result<TimerSnapshot, InfraError> {
    let snapshot = state.timer.reset()?;
    state.log.info("reset_timer", "timer reset to idle work phase");
    Ok(snapshot)
}

pub fn skip_break_impl<N: Notifier + 'static>(
    state: &AppState<N>,
) -> Result<TimerSnapshot, InfraError> {
    let snapshot = state.timer.skip_break()?;
    state.log.info("skip_break", &format!("phase={}", snapshot.phase));
    Ok(snapshot)
}

pub fn get_timer_state_impl<N: Notifier + 'static>(
    state: &AppState<N>,
) -> Result<TimerSnapshot, InfraError> {
    state.timer.snapshot()
}

pub fn update_timer_settings_impl<N: Notifier + 'static>(
    state: &AppState<N>,
    config: TimerConfig,
) -> Result<TimerSnapshot, InfraError> {
    let snapshot = state.timer.update_settings(config)?;
    persist_timer_config(&state.config_dir, &config)?;
    state.log.info(
        "update_timer_settings",
        &format!(
            "work={} break={} long_break={} sessions={}",
            config.work_minutes,
            config.break_minutes,
            config.long_break_minutes,
            config.sessions_before_long_break
        ),
    );
    Ok(snapshot)
}

pub fn get_report_summary_impl<N: Notifier + 'static>(
    state: &AppState<N>,
    range_type: String,
    reference_date: Option<String>,
) -> Result<ReportSummary, InfraError> {
    let range_type = RangeType::parse(&range_type).map_err(InfraError::InvalidInput)?;
    let reference = resolve_reference_date(reference_date.as_deref(), state.timezone)?;
    let tasks = state.tasks.list_tasks()?;
    let summary = summarize(&tasks, range_type, reference, state.timezone);
    state.log.info(
        "get_report_summary",
        &format!(
            "range={} reference={} completed={}",
            range_type.as_str(),
            reference,
            summary.completed_count
        ),
    );
    Ok(summary)
}

pub fn shift_report_reference_impl<N: Notifier + 'static>(
    state: &AppState<N>,
    range_type: String,
    reference_date: String,
    delta: i32,
) -> Result<String, InfraError> {
    let range_type = RangeType::parse(&range_type).map_err(InfraError::InvalidInput)?;
    let reference = parse_reference_date(&reference_date)?;
    let shifted = shift_reference(range_type, reference, delta);
    state.log.info(
        "shift_report_reference",
        &format!("range={} {} -> {}", range_type.as_str(), reference, shifted),
    );
    Ok(shifted.format("%Y-%m-%d").to_string())
}

fn resolve_reference_date(raw: Option<&str>, timezone: Tz) -> Result<NaiveDate, InfraError> {
    match raw {
        Some(value) => parse_reference_date(value),
        None => Ok(Utc::now().with_timezone(&timezone).date_naive()),
    }
}

fn parse_reference_date(value: &str) -> Result<NaiveDate, InfraError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|error| {
        InfraError::InvalidInput(format!("reference_date must be YYYY-MM-DD: {error}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reports::weekday_name;
    use chrono::Datelike;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    struct TempWorkspace {
        path: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "focustrack-command-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp workspace");
            Self { path }
        }

        fn app_state(&self) -> AppState {
            AppState::new(self.path.clone()).expect("initialize app state")
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn create_task_rejects_empty_title() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let result = create_task_impl(&state, "   ".to_string(), None, 1.0);
        assert!(result.is_err());
        assert!(list_tasks_impl(&state).expect("list").is_empty());
    }

    #[test]
    fn create_and_list_tasks_roundtrip() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let first = create_task_impl(
            &state,
            "Write report".to_string(),
            Some("quarterly numbers".to_string()),
            2.0,
        )
        .expect("create first");
        let second =
            create_task_impl(&state, "Answer mail".to_string(), None, 0.5).expect("create second");

        let listed = list_tasks_impl(&state).expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
        assert_eq!(listed[0].status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn toggle_and_delete_task_flow() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let task = create_task_impl(&state, "Cycle".to_string(), None, 1.0).expect("create");

        assert_eq!(
            toggle_task_status_impl(&state, task.id).expect("toggle").status,
            TaskStatus::InProgress
        );
        assert_eq!(
            toggle_task_status_impl(&state, task.id).expect("toggle").status,
            TaskStatus::Completed
        );
        assert_eq!(
            toggle_task_status_impl(&state, task.id).expect("toggle").status,
            TaskStatus::Pending
        );

        assert!(delete_task_impl(&state, task.id).expect("delete"));
        assert!(!delete_task_impl(&state, task.id).expect("redelete"));
        assert!(list_tasks_impl(&state).expect("list").is_empty());
    }

    #[tokio::test]
    async fn timer_select_start_pause_flow() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let task = create_task_impl(&state, "Focused".to_string(), None, 2.0).expect("create");

        let selected = select_timer_task_impl(&state, task.id).expect("select");
        assert_eq!(selected.selected_task_id, Some(task.id));
        assert_eq!(selected.run_state, "idle");

        let started = start_timer_impl(&state).expect("start");
        assert_eq!(started.run_state, "running");
        assert_eq!(started.phase, "work");

        let paused = pause_timer_impl(&state).expect("pause");
        assert_eq!(paused.run_state, "paused");

        // Under a minute elapsed, so the budget is untouched.
        let unchanged = list_tasks_impl(&state).expect("list");
        assert_eq!(unchanged[0].estimated_hours, 2.0);

        let reset = reset_timer_impl(&state).expect("reset");
        assert_eq!(reset.run_state, "idle");
        assert_eq!(reset.phase, "work");
    }

    #[tokio::test]
    async fn start_without_selection_stays_idle() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let snapshot = start_timer_impl(&state).expect("start");
        assert_eq!(snapshot.run_state, "idle");
    }

    #[tokio::test]
    async fn deleting_the_selected_task_clears_the_selection() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let task = create_task_impl(&state, "Vanishing".to_string(), None, 1.0).expect("create");

        select_timer_task_impl(&state, task.id).expect("select");
        delete_task_impl(&state, task.id).expect("delete");

        let snapshot = get_timer_state_impl(&state).expect("snapshot");
        assert_eq!(snapshot.selected_task_id, None);
    }

    #[tokio::test]
    async fn settings_update_persists_to_the_config_file() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let config = TimerConfig {
            work_minutes: 50,
            break_minutes: 10,
            long_break_minutes: 30,
            sessions_before_long_break: 3,
        };

        let snapshot = update_timer_settings_impl(&state, config).expect("update");
        assert_eq!(snapshot.remaining_seconds, 50 * 60);
        assert_eq!(load_timer_config(state.config_dir()), config);
    }

    #[test]
    fn report_summary_counts_completed_tasks_in_the_current_week() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let report = create_task_impl(&state, "Work: report".to_string(), None, 2.0)
            .expect("create");
        let mail = create_task_impl(&state, "Work: mail".to_string(), None, 1.0).expect("create");
        create_task_impl(&state, "Untouched".to_string(), None, 4.0).expect("create");
        set_task_status_impl(&state, report.id, "completed".to_string()).expect("complete");
        set_task_status_impl(&state, mail.id, "completed".to_string()).expect("complete");

        let summary =
            get_report_summary_impl(&state, "week".to_string(), None).expect("summarize");
        assert_eq!(summary.completed_count, 2);
        assert_eq!(summary.total_hours, 3.0);

        let today = Utc::now().date_naive();
        let bucket = summary
            .buckets
            .iter()
            .find(|bucket| bucket.label == weekday_name(today.weekday()))
            .expect("today's bucket");
        assert_eq!(bucket.hours, 3.0);
        assert_eq!(summary.categories.len(), 1);
        assert_eq!(summary.categories[0].category, "Work");
    }

    #[test]
    fn report_summary_rejects_unknown_range_types() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        assert!(get_report_summary_impl(&state, "year".to_string(), None).is_err());
        assert!(
            get_report_summary_impl(&state, "week".to_string(), Some("03-08".to_string())).is_err()
        );
    }

    #[test]
    fn shift_report_reference_moves_by_one_unit() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        assert_eq!(
            shift_report_reference_impl(&state, "week".to_string(), "2026-08-05".to_string(), 1)
                .expect("shift"),
            "2026-08-12"
        );
        assert_eq!(
            shift_report_reference_impl(&state, "month".to_string(), "2026-03-31".to_string(), -1)
                .expect("shift"),
            "2026-02-28"
        );
    }
}
