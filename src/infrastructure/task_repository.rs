use crate::domain::models::{Task, TaskDraft, TaskStatus};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// CRUD contract the core consumes. Implementations own id assignment and
/// keep `estimated_hours` from going negative: `decrement_hours` applies
/// `max(0, current - delta)` against the stored value in one atomic step,
/// so concurrent reconciliations for the same task serialize here and no
/// decrement is lost.
pub trait TaskRepository: Send + Sync {
    fn create(&self, draft: &TaskDraft) -> Result<Task, InfraError>;
    /// All tasks in creation order.
    fn list(&self) -> Result<Vec<Task>, InfraError>;
    fn get(&self, task_id: i64) -> Result<Option<Task>, InfraError>;
    fn set_status(&self, task_id: i64, status: TaskStatus) -> Result<Option<Task>, InfraError>;
    fn decrement_hours(&self, task_id: i64, hours_delta: f64) -> Result<Option<Task>, InfraError>;
    fn delete(&self, task_id: i64) -> Result<bool, InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteTaskRepository {
    db_path: PathBuf,
}

impl SqliteTaskRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

fn map_task(row: &Row<'_>) -> rusqlite::Result<(i64, String, Option<String>, String, f64, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn into_task(
    (id, title, description, status_raw, estimated_hours, created_at_raw): (
        i64,
        String,
        Option<String>,
        String,
        f64,
        String,
    ),
) -> Result<Task, InfraError> {
    let status = TaskStatus::parse(&status_raw).map_err(InfraError::InvalidInput)?;
    let created_at = parse_stored_datetime(&created_at_raw)?;
    Ok(Task {
        id,
        title,
        description,
        status,
        estimated_hours,
        created_at,
    })
}

fn parse_stored_datetime(raw: &str) -> Result<DateTime<Utc>, InfraError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| {
            InfraError::InvalidInput(format!("invalid tasks.created_at '{}': {error}", raw))
        })
}

const SELECT_COLUMNS: &str = "id, title, description, status, estimated_hours, created_at";

impl TaskRepository for SqliteTaskRepository {
    fn create(&self, draft: &TaskDraft) -> Result<Task, InfraError> {
        let connection = self.connect()?;
        let created_at = Utc::now();
        connection.execute(
            "INSERT INTO tasks (title, description, status, estimated_hours, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                draft.title,
                draft.description,
                TaskStatus::Pending.as_str(),
                draft.estimated_hours,
                created_at.to_rfc3339(),
            ],
        )?;
        let id = connection.last_insert_rowid();
        Ok(Task {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            status: TaskStatus::Pending,
            estimated_hours: draft.estimated_hours,
            created_at,
        })
    }

    fn list(&self) -> Result<Vec<Task>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM tasks ORDER BY id"
        ))?;
        let rows = statement.query_map([], map_task)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(into_task(row?)?);
        }
        Ok(tasks)
    }

    fn get(&self, task_id: i64) -> Result<Option<Task>, InfraError> {
        let connection = self.connect()?;
        let row = connection
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM tasks WHERE id = ?1"),
                params![task_id],
                map_task,
            )
            .optional()?;
        row.map(into_task).transpose()
    }

    fn set_status(&self, task_id: i64, status: TaskStatus) -> Result<Option<Task>, InfraError> {
        let connection = self.connect()?;
        let changed = connection.execute(
            "UPDATE tasks SET status = ?1 WHERE id = ?2",
            params![status.as_str(), task_id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get(task_id)
    }

    fn decrement_hours(&self, task_id: i64, hours_delta: f64) -> Result<Option<Task>, InfraError> {
        let connection = self.connect()?;
        let changed = connection.execute(
            "UPDATE tasks SET estimated_hours = MAX(0, estimated_hours - ?1) WHERE id = ?2",
            params![hours_delta, task_id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get(task_id)
    }

    fn delete(&self, task_id: i64) -> Result<bool, InfraError> {
        let connection = self.connect()?;
        let deleted = connection.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
        Ok(deleted > 0)
    }
}

#[derive(Debug, Default)]
struct InMemoryState {
    next_id: i64,
    order: Vec<i64>,
    tasks: HashMap<i64, Task>,
}

#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    state: Mutex<InMemoryState>,
}

impl InMemoryTaskRepository {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, InfraError> {
        self.state
            .lock()
            .map_err(|error| InfraError::InvalidInput(format!("task store lock poisoned: {error}")))
    }
}

impl TaskRepository for InMemoryTaskRepository {
    fn create(&self, draft: &TaskDraft) -> Result<Task, InfraError> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let task = Task {
            id: state.next_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            status: TaskStatus::Pending,
            estimated_hours: draft.estimated_hours,
            created_at: Utc::now(),
        };
        state.order.push(task.id);
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    fn list(&self) -> Result<Vec<Task>, InfraError> {
        let state = self.lock()?;
        Ok(state
            .order
            .iter()
            .filter_map(|task_id| state.tasks.get(task_id).cloned())
            .collect())
    }

    fn get(&self, task_id: i64) -> Result<Option<Task>, InfraError> {
        let state = self.lock()?;
        Ok(state.tasks.get(&task_id).cloned())
    }

    fn set_status(&self, task_id: i64, status: TaskStatus) -> Result<Option<Task>, InfraError> {
        let mut state = self.lock()?;
        let Some(task) = state.tasks.get_mut(&task_id) else {
            return Ok(None);
        };
        task.status = status;
        Ok(Some(task.clone()))
    }

    fn decrement_hours(&self, task_id: i64, hours_delta: f64) -> Result<Option<Task>, InfraError> {
        let mut state = self.lock()?;
        let Some(task) = state.tasks.get_mut(&task_id) else {
            return Ok(None);
        };
        task.estimated_hours = (task.estimated_hours - hours_delta).max(0.0);
        Ok(Some(task.clone()))
    }

    fn delete(&self, task_id: i64) -> Result<bool, InfraError> {
        let mut state = self.lock()?;
        let removed = state.tasks.remove(&task_id).is_some();
        if removed {
            state.order.retain(|candidate| *candidate != task_id);
        }
        Ok(removed)
    }
}
