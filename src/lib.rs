pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{bootstrap_workspace, BootstrapResult};
pub use application::commands::{
    create_task_impl, delete_task_impl, get_report_summary_impl, get_timer_state_impl,
    init_notifications_impl, list_tasks_impl, pause_timer_impl, reset_timer_impl,
    select_timer_task_impl, set_task_status_impl, shift_report_reference_impl, skip_break_impl,
    start_timer_impl, toggle_task_status_impl, update_timer_settings_impl, AppState, CommandLog,
};
pub use application::reconciler::TimeReconciler;
pub use application::task_service::{TaskChange, TaskService};
pub use application::timer_runtime::{TimerRuntime, TimerSnapshot};
pub use domain::models::{Task, TaskDraft, TaskStatus, TimerConfig};
pub use domain::reports::{
    category_of, report_range, shift_reference, summarize, BucketTotal, CategoryTotal, RangeType,
    ReportRange, ReportSummary,
};
pub use domain::timer::{PhaseCompleted, ReconcileRequest, RunState, TimerEngine, TimerPhase};
pub use infrastructure::error::InfraError;
pub use infrastructure::notifier::{Notifier, NullNotifier};
pub use infrastructure::task_repository::{
    InMemoryTaskRepository, SqliteTaskRepository, TaskRepository,
};
