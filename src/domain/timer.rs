use crate::domain::models::TimerConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Work,
    Break,
    LongBreak,
}

impl TimerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Break => "break",
            Self::LongBreak => "long_break",
        }
    }

    pub fn is_break(self) -> bool {
        matches!(self, Self::Break | Self::LongBreak)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

/// Focus minutes to subtract from a task's remaining budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileRequest {
    pub task_id: i64,
    pub minutes_worked: u32,
}

/// Emitted once per completed phase, never more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseCompleted {
    pub finished: TimerPhase,
    pub next: TimerPhase,
    pub reconcile: Option<ReconcileRequest>,
}

/// Work/break countdown as an explicit state machine. The engine holds the
/// authoritative phase and remaining-seconds fields and is advanced only by
/// `tick`; it never reads the wall clock, so a driver can feed it ticks at
/// whatever cadence it likes and tests can fast-forward synchronously.
///
/// Focus seconds accumulate in `worked_seconds` and are paid out as whole
/// minutes on pause and on work-phase completion; the sub-minute remainder
/// carries over so repeated pauses neither lose nor double-count time.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    config: TimerConfig,
    run_state: RunState,
    phase: TimerPhase,
    remaining_seconds: u32,
    session_count: u32,
    selected_task_id: Option<i64>,
    worked_seconds: u32,
}

impl TimerEngine {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            run_state: RunState::Idle,
            phase: TimerPhase::Work,
            remaining_seconds: config.work_minutes * 60,
            session_count: 0,
            selected_task_id: None,
            worked_seconds: 0,
        }
    }

    pub fn config(&self) -> TimerConfig {
        self.config
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn session_count(&self) -> u32 {
        self.session_count
    }

    pub fn selected_task_id(&self) -> Option<i64> {
        self.selected_task_id
    }

    /// Attach the countdown to a task. Rejected while the countdown runs.
    pub fn select_task(&mut self, task_id: i64) -> bool {
        if self.run_state == RunState::Running {
            return false;
        }
        self.selected_task_id = Some(task_id);
        true
    }

    /// Drop the selection when the given task disappears from the store.
    pub fn deselect_task(&mut self, task_id: i64) {
        if self.selected_task_id == Some(task_id) {
            self.selected_task_id = None;
        }
    }

    /// Begin or resume counting. No-op without a selected task; the caller
    /// is responsible for checking that the task is not completed.
    pub fn start(&mut self) -> bool {
        if self.selected_task_id.is_none() || self.run_state == RunState::Running {
            return false;
        }
        self.run_state = RunState::Running;
        true
    }

    /// Advance the countdown by one second. Returns the completion event
    /// when this tick finishes the current phase.
    pub fn tick(&mut self) -> Option<PhaseCompleted> {
        if self.run_state != RunState::Running {
            return None;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.phase == TimerPhase::Work {
            self.worked_seconds += 1;
        }
        if self.remaining_seconds > 0 {
            return None;
        }

        let finished = self.phase;
        let reconcile = if finished == TimerPhase::Work {
            self.take_worked_minutes()
        } else {
            None
        };

        let next = if finished == TimerPhase::Work {
            self.session_count += 1;
            if self.session_count == self.config.sessions_before_long_break {
                self.session_count = 0;
                TimerPhase::LongBreak
            } else {
                TimerPhase::Break
            }
        } else {
            TimerPhase::Work
        };

        self.phase = next;
        self.remaining_seconds = self.phase_duration_seconds(next);

        Some(PhaseCompleted {
            finished,
            next,
            reconcile,
        })
    }

    /// Stop counting. Pausing a work phase pays out the accumulated whole
    /// minutes; under a minute of focus emits nothing and the seconds carry
    /// over to the next payout.
    pub fn pause(&mut self) -> Option<ReconcileRequest> {
        if self.run_state != RunState::Running {
            return None;
        }
        self.run_state = RunState::Paused;
        if self.phase == TimerPhase::Work {
            self.take_worked_minutes()
        } else {
            None
        }
    }

    /// Back to an idle work phase at full duration. The session count
    /// survives so the long-break cadence is unaffected; unpaid focus
    /// seconds are discarded.
    pub fn reset(&mut self) {
        self.run_state = RunState::Idle;
        self.phase = TimerPhase::Work;
        self.remaining_seconds = self.config.work_minutes * 60;
        self.worked_seconds = 0;
    }

    /// Cut a break short. Only valid while a break phase is not running.
    pub fn skip_break(&mut self) -> bool {
        if self.run_state == RunState::Running || !self.phase.is_break() {
            return false;
        }
        self.run_state = RunState::Idle;
        self.phase = TimerPhase::Work;
        self.remaining_seconds = self.config.work_minutes * 60;
        true
    }

    /// Replace the durations. Only while idle, so an in-flight countdown is
    /// never corrupted; the current phase is reloaded from the new config.
    pub fn set_config(&mut self, config: TimerConfig) -> bool {
        if self.run_state != RunState::Idle {
            return false;
        }
        self.config = config;
        self.remaining_seconds = self.phase_duration_seconds(self.phase);
        true
    }

    fn phase_duration_seconds(&self, phase: TimerPhase) -> u32 {
        let minutes = match phase {
            TimerPhase::Work => self.config.work_minutes,
            TimerPhase::Break => self.config.break_minutes,
            TimerPhase::LongBreak => self.config.long_break_minutes,
        };
        minutes * 60
    }

    fn take_worked_minutes(&mut self) -> Option<ReconcileRequest> {
        let minutes = self.worked_seconds / 60;
        self.worked_seconds %= 60;
        let task_id = self.selected_task_id?;
        if minutes == 0 {
            return None;
        }
        Some(ReconcileRequest {
            task_id,
            minutes_worked: minutes,
        })
    }
}
