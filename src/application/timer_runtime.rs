use crate::application::commands::CommandLog;
use crate::application::reconciler::TimeReconciler;
use crate::application::task_service::TaskService;
use crate::domain::models::{TaskStatus, TimerConfig};
use crate::domain::timer::{PhaseCompleted, RunState, TimerEngine, TimerPhase};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::notifier::Notifier;
use crate::infrastructure::task_repository::TaskRepository;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub run_state: String,
    pub phase: String,
    pub remaining_seconds: u32,
    pub session_count: u32,
    pub selected_task_id: Option<i64>,
}

/// Drives the timer engine with wall-clock ticks. At most one countdown
/// task exists per runtime: every transition that stops counting aborts
/// the previous task before a new one may be armed, so two countdowns can
/// never race each other.
pub struct TimerRuntime<R, N>
where
    R: TaskRepository + 'static,
    N: Notifier + 'static,
{
    engine: Arc<Mutex<TimerEngine>>,
    tasks: Arc<TaskService<R>>,
    reconciler: Arc<TimeReconciler<R>>,
    notifier: Arc<N>,
    log: Arc<CommandLog>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl<R, N> TimerRuntime<R, N>
where
    R: TaskRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        config: TimerConfig,
        tasks: Arc<TaskService<R>>,
        notifier: Arc<N>,
        log: Arc<CommandLog>,
    ) -> Self {
        let reconciler = Arc::new(TimeReconciler::new(Arc::clone(&tasks)));
        Self {
            engine: Arc::new(Mutex::new(TimerEngine::new(config))),
            tasks,
            reconciler,
            notifier,
            log,
            ticker: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> Result<TimerSnapshot, InfraError> {
        let engine = self.lock_engine()?;
        Ok(snapshot_of(&engine))
    }

    /// Attach the countdown to an existing task. Ignored while running.
    pub fn select_task(&self, task_id: i64) -> Result<TimerSnapshot, InfraError> {
        self.tasks.require_task(task_id)?;
        let mut engine = self.lock_engine()?;
        engine.select_task(task_id);
        Ok(snapshot_of(&engine))
    }

    /// Clear the selection after a task disappears from the store.
    pub fn on_task_deleted(&self, task_id: i64) -> Result<(), InfraError> {
        self.lock_engine()?.deselect_task(task_id);
        Ok(())
    }

    /// Begin counting. No-op without a selected, non-completed task.
    pub fn start(&self) -> Result<TimerSnapshot, InfraError> {
        let selected = self.lock_engine()?.selected_task_id();
        let Some(task_id) = selected else {
            return self.snapshot();
        };

        let Some(task) = self.tasks.get_task(task_id)? else {
            let mut engine = self.lock_engine()?;
            engine.deselect_task(task_id);
            return Ok(snapshot_of(&engine));
        };
        if task.status == TaskStatus::Completed {
            return self.snapshot();
        }

        let started = self.lock_engine()?.start();
        if started {
            self.arm_ticker()?;
        }
        self.snapshot()
    }

    /// Stop counting and settle the focus minutes accumulated so far. A
    /// failed settlement is logged and the pause still succeeds; the next
    /// payout will run against the store's then-current value.
    pub fn pause(&self) -> Result<TimerSnapshot, InfraError> {
        self.cancel_ticker()?;
        let request = {
            let mut engine = self.lock_engine()?;
            engine.pause()
        };
        if let Some(request) = request {
            if let Err(error) = self
                .reconciler
                .reconcile(request.task_id, request.minutes_worked)
            {
                self.log.error(
                    "pause_timer",
                    &format!(
                        "reconciliation failed for task_id={}: {error}",
                        request.task_id
                    ),
                );
            }
        }
        self.snapshot()
    }

    pub fn reset(&self) -> Result<TimerSnapshot, InfraError> {
        self.cancel_ticker()?;
        let mut engine = self.lock_engine()?;
        engine.reset();
        Ok(snapshot_of(&engine))
    }

    /// Cut a non-running break short. No-op in any other state.
    pub fn skip_break(&self) -> Result<TimerSnapshot, InfraError> {
        let mut engine = self.lock_engine()?;
        engine.skip_break();
        Ok(snapshot_of(&engine))
    }

    pub fn update_settings(&self, config: TimerConfig) -> Result<TimerSnapshot, InfraError> {
        config.validate().map_err(InfraError::InvalidInput)?;
        let mut engine = self.lock_engine()?;
        if !engine.set_config(config) {
            return Err(InfraError::InvalidInput(
                "timer settings can only change while the timer is idle".to_string(),
            ));
        }
        Ok(snapshot_of(&engine))
    }

    pub fn shutdown(&self) -> Result<(), InfraError> {
        self.cancel_ticker()
    }

    fn arm_ticker(&self) -> Result<(), InfraError> {
        let mut slot = self.lock_ticker()?;
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let engine = Arc::clone(&self.engine);
        let reconciler = Arc::clone(&self.reconciler);
        let notifier = Arc::clone(&self.notifier);
        let log = Arc::clone(&self.log);

        *slot = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick of a fresh interval completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;
                let (completion, still_running) = {
                    let Ok(mut engine) = engine.lock() else {
                        break;
                    };
                    let completion = engine.tick();
                    (completion, engine.run_state() == RunState::Running)
                };

                if let Some(completed) = completion {
                    dispatch_completion(&completed, &reconciler, &notifier, &log);
                }
                if !still_running {
                    break;
                }
            }
        }));
        Ok(())
    }

    fn cancel_ticker(&self) -> Result<(), InfraError> {
        let mut slot = self.lock_ticker()?;
        if let Some(handle) = slot.take() {
            handle.abort();
        }
        Ok(())
    }

    fn lock_engine(&self) -> Result<MutexGuard<'_, TimerEngine>, InfraError> {
        self.engine
            .lock()
            .map_err(|error| InfraError::InvalidInput(format!("timer lock poisoned: {error}")))
    }

    fn lock_ticker(&self) -> Result<MutexGuard<'_, Option<JoinHandle<()>>>, InfraError> {
        self.ticker
            .lock()
            .map_err(|error| InfraError::InvalidInput(format!("ticker lock poisoned: {error}")))
    }

    #[cfg(test)]
    fn ticker_is_armed(&self) -> bool {
        self.ticker
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }
}

impl<R, N> Drop for TimerRuntime<R, N>
where
    R: TaskRepository + 'static,
    N: Notifier + 'static,
{
    fn drop(&mut self) {
        if let Ok(mut slot) = self.ticker.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

fn dispatch_completion<R: TaskRepository + 'static>(
    completed: &PhaseCompleted,
    reconciler: &Arc<TimeReconciler<R>>,
    notifier: &Arc<impl Notifier + 'static>,
    log: &Arc<CommandLog>,
) {
    let message = phase_message(completed.finished);
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        // Delivery failures are ignored.
        let _ = notifier.notify(message).await;
    });

    if let Some(request) = completed.reconcile {
        if let Err(error) = reconciler.reconcile(request.task_id, request.minutes_worked) {
            log.error(
                "timer_tick",
                &format!(
                    "reconciliation failed for task_id={}: {error}",
                    request.task_id
                ),
            );
        }
    }
}

fn phase_message(finished: TimerPhase) -> &'static str {
    match finished {
        TimerPhase::Work => "Work session finished!",
        TimerPhase::Break | TimerPhase::LongBreak => "Break finished!",
    }
}

fn snapshot_of(engine: &TimerEngine) -> TimerSnapshot {
    TimerSnapshot {
        run_state: engine.run_state().as_str().to_string(),
        phase: engine.phase().as_str().to_string(),
        remaining_seconds: engine.remaining_seconds(),
        session_count: engine.session_count(),
        selected_task_id: engine.selected_task_id(),
    }
}
