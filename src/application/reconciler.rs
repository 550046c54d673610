use crate::application::task_service::TaskService;
use crate::domain::models::Task;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::task_repository::TaskRepository;
use std::sync::Arc;

/// Converts elapsed focus minutes into a decrement of the task's remaining
/// estimate. The decrement runs against the store's current value, so a
/// stale caller can never resurrect hours that another write already
/// consumed.
pub struct TimeReconciler<R: TaskRepository> {
    tasks: Arc<TaskService<R>>,
}

impl<R: TaskRepository> TimeReconciler<R> {
    pub fn new(tasks: Arc<TaskService<R>>) -> Self {
        Self { tasks }
    }

    pub fn reconcile(&self, task_id: i64, minutes_worked: u32) -> Result<Task, InfraError> {
        if minutes_worked == 0 {
            return Err(InfraError::InvalidInput(
                "minutes_worked must be >= 1".to_string(),
            ));
        }
        let hours_worked = f64::from(minutes_worked) / 60.0;
        self.tasks.decrement_task_hours(task_id, hours_worked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::task_service::TaskChange;
    use crate::infrastructure::task_repository::InMemoryTaskRepository;
    use proptest::prelude::*;

    fn reconciler() -> (Arc<TaskService<InMemoryTaskRepository>>, TimeReconciler<InMemoryTaskRepository>) {
        let tasks = Arc::new(TaskService::new(Arc::new(InMemoryTaskRepository::default())));
        let reconciler = TimeReconciler::new(Arc::clone(&tasks));
        (tasks, reconciler)
    }

    #[test]
    fn zero_minutes_are_rejected_without_touching_the_store() {
        let (tasks, reconciler) = reconciler();
        let task = tasks.create_task("Budgeted", None, 2.0).expect("create");

        assert!(matches!(
            reconciler.reconcile(task.id, 0),
            Err(InfraError::InvalidInput(_))
        ));
        let unchanged = tasks.require_task(task.id).expect("task exists");
        assert_eq!(unchanged.estimated_hours, 2.0);
    }

    #[test]
    fn missing_task_surfaces_as_not_found() {
        let (_tasks, reconciler) = reconciler();
        assert!(matches!(
            reconciler.reconcile(99, 5),
            Err(InfraError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn reconciliation_broadcasts_the_refreshed_task() {
        let (tasks, reconciler) = reconciler();
        let task = tasks.create_task("Observed", None, 1.0).expect("create");
        let mut changes = tasks.subscribe();

        let updated = reconciler.reconcile(task.id, 30).expect("reconcile");
        assert_eq!(updated.estimated_hours, 0.5);
        assert!(matches!(
            changes.try_recv().expect("hours event"),
            TaskChange::HoursDecremented(event) if event.estimated_hours == 0.5
        ));
    }

    #[test]
    fn sequential_reconciliations_apply_against_the_live_value() {
        let (tasks, reconciler) = reconciler();
        let task = tasks.create_task("Drained", None, 1.0).expect("create");

        reconciler.reconcile(task.id, 30).expect("first");
        reconciler.reconcile(task.id, 30).expect("second");
        let drained = reconciler.reconcile(task.id, 30).expect("third");
        assert_eq!(drained.estimated_hours, 0.0);
    }

    proptest! {
        #[test]
        fn remaining_budget_is_clamped_never_negative(
            estimated_hours in 0.0f64..1000.0,
            minutes_worked in 1u32..10_000
        ) {
            let (tasks, reconciler) = reconciler();
            let task = tasks
                .create_task("Property", None, estimated_hours)
                .expect("create");

            let updated = reconciler
                .reconcile(task.id, minutes_worked)
                .expect("reconcile");

            let expected = (estimated_hours - f64::from(minutes_worked) / 60.0).max(0.0);
            prop_assert!(updated.estimated_hours >= 0.0);
            prop_assert!((updated.estimated_hours - expected).abs() < 1e-9);
        }
    }
}
