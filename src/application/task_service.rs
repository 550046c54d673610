use crate::domain::models::{validate_hours, validate_non_empty, Task, TaskDraft, TaskStatus};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::task_repository::TaskRepository;
use std::sync::Arc;
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Typed change events observers subscribe to. Every mutation that reaches
/// the repository is followed by exactly one broadcast so derived views
/// (the report screen, the task list) refresh from the store.
#[derive(Debug, Clone)]
pub enum TaskChange {
    Created(Task),
    StatusChanged(Task),
    HoursDecremented(Task),
    Deleted { task_id: i64 },
}

/// Validated gateway to the task collection. Input is rejected before any
/// repository call, so a failed write never leaves partial state behind.
pub struct TaskService<R: TaskRepository> {
    repository: Arc<R>,
    changes: broadcast::Sender<TaskChange>,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            repository,
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskChange> {
        self.changes.subscribe()
    }

    pub fn create_task(
        &self,
        title: &str,
        description: Option<&str>,
        estimated_hours: f64,
    ) -> Result<Task, InfraError> {
        let title = title.trim();
        validate_non_empty(title, "task.title").map_err(InfraError::InvalidInput)?;
        validate_hours(estimated_hours, "task.estimated_hours").map_err(InfraError::InvalidInput)?;

        let draft = TaskDraft {
            title: title.to_string(),
            description: description
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned),
            estimated_hours,
        };
        let task = self.repository.create(&draft)?;
        self.broadcast(TaskChange::Created(task.clone()));
        Ok(task)
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>, InfraError> {
        self.repository.list()
    }

    pub fn get_task(&self, task_id: i64) -> Result<Option<Task>, InfraError> {
        self.repository.get(task_id)
    }

    pub fn require_task(&self, task_id: i64) -> Result<Task, InfraError> {
        self.repository
            .get(task_id)?
            .ok_or_else(|| InfraError::NotFound(format!("task not found: {}", task_id)))
    }

    pub fn set_task_status(&self, task_id: i64, status: TaskStatus) -> Result<Task, InfraError> {
        let updated = self
            .repository
            .set_status(task_id, status)?
            .ok_or_else(|| InfraError::NotFound(format!("task not found: {}", task_id)))?;
        self.broadcast(TaskChange::StatusChanged(updated.clone()));
        Ok(updated)
    }

    /// Pending, in progress, completed, back to pending.
    pub fn toggle_task_status(&self, task_id: i64) -> Result<Task, InfraError> {
        let current = self.require_task(task_id)?;
        self.set_task_status(task_id, current.status.advance())
    }

    /// Subtract focus hours from the task's remaining budget. The
    /// repository clamps at zero against its live value.
    pub fn decrement_task_hours(&self, task_id: i64, hours_delta: f64) -> Result<Task, InfraError> {
        validate_hours(hours_delta, "hours_delta").map_err(InfraError::InvalidInput)?;
        let updated = self
            .repository
            .decrement_hours(task_id, hours_delta)?
            .ok_or_else(|| InfraError::NotFound(format!("task not found: {}", task_id)))?;
        self.broadcast(TaskChange::HoursDecremented(updated.clone()));
        Ok(updated)
    }

    pub fn delete_task(&self, task_id: i64) -> Result<bool, InfraError> {
        let removed = self.repository.delete(task_id)?;
        if removed {
            self.broadcast(TaskChange::Deleted { task_id });
        }
        Ok(removed)
    }

    fn broadcast(&self, change: TaskChange) {
        // Nobody listening is fine.
        let _ = self.changes.send(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::task_repository::InMemoryTaskRepository;

    fn service() -> TaskService<InMemoryTaskRepository> {
        TaskService::new(Arc::new(InMemoryTaskRepository::default()))
    }

    #[test]
    fn create_task_rejects_bad_input_before_the_store() {
        let service = service();
        assert!(service.create_task("   ", None, 1.0).is_err());
        assert!(service.create_task("Valid", None, -1.0).is_err());
        assert!(service.create_task("Valid", None, f64::NAN).is_err());
        assert!(service.list_tasks().expect("list").is_empty());
    }

    #[test]
    fn create_task_normalizes_title_and_description() {
        let service = service();
        let task = service
            .create_task("  Write report  ", Some("   "), 2.0)
            .expect("create");
        assert_eq!(task.title, "Write report");
        assert_eq!(task.description, None);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn toggling_three_times_returns_to_the_original_status() {
        let service = service();
        let task = service.create_task("Cycle", None, 1.0).expect("create");

        let first = service.toggle_task_status(task.id).expect("toggle");
        assert_eq!(first.status, TaskStatus::InProgress);
        let second = service.toggle_task_status(task.id).expect("toggle");
        assert_eq!(second.status, TaskStatus::Completed);
        let third = service.toggle_task_status(task.id).expect("toggle");
        assert_eq!(third.status, task.status);
    }

    #[tokio::test]
    async fn mutations_broadcast_typed_changes() {
        let service = service();
        let mut changes = service.subscribe();

        let task = service.create_task("Observed", None, 1.0).expect("create");
        service
            .set_task_status(task.id, TaskStatus::Completed)
            .expect("set status");
        service
            .decrement_task_hours(task.id, 0.5)
            .expect("decrement");
        service.delete_task(task.id).expect("delete");

        assert!(matches!(
            changes.try_recv().expect("created event"),
            TaskChange::Created(created) if created.id == task.id
        ));
        assert!(matches!(
            changes.try_recv().expect("status event"),
            TaskChange::StatusChanged(updated) if updated.status == TaskStatus::Completed
        ));
        assert!(matches!(
            changes.try_recv().expect("hours event"),
            TaskChange::HoursDecremented(updated) if updated.estimated_hours == 0.5
        ));
        assert!(matches!(
            changes.try_recv().expect("deleted event"),
            TaskChange::Deleted { task_id } if task_id == task.id
        ));
    }

    #[test]
    fn missing_tasks_surface_as_not_found() {
        let service = service();
        assert!(matches!(
            service.set_task_status(99, TaskStatus::Completed),
            Err(InfraError::NotFound(_))
        ));
        assert!(matches!(
            service.decrement_task_hours(99, 1.0),
            Err(InfraError::NotFound(_))
        ));
        assert!(!service.delete_task(99).expect("delete missing"));
    }
}
