//! Step state machine
//!
//! Each step of a [`BuildCommand`] moves Pending -> Running -> Succeeded or
//! Failed. A failed required step aborts the chain: later steps stay
//! Pending and are never started.

use serde::Serialize;

use crate::buildsys::{BuildCommand, BuildStep};

/// State of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// A step with its state and result
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: BuildStep,
    pub state: StepState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

/// State machine over the steps of one build attempt
#[derive(Debug, Clone)]
pub struct StepMachine {
    records: Vec<StepRecord>,
}

impl StepMachine {
    pub fn new(command: &BuildCommand) -> Self {
        Self {
            records: command
                .steps()
                .iter()
                .cloned()
                .map(|step| StepRecord {
                    step,
                    state: StepState::Pending,
                    exit_code: None,
                    duration_ms: 0,
                })
                .collect(),
        }
    }

    /// Index of the next step to run, `None` when finished or aborted
    pub fn next_pending(&self) -> Option<usize> {
        if self.is_aborted() || self.records.iter().any(|r| r.state == StepState::Running) {
            return None;
        }
        self.records
            .iter()
            .position(|r| r.state == StepState::Pending)
    }

    /// Mark a pending step as running and return it
    pub fn start(&mut self, index: usize) -> &BuildStep {
        let record = &mut self.records[index];
        debug_assert_eq!(record.state, StepState::Pending);
        record.state = StepState::Running;
        &record.step
    }

    pub fn succeed(&mut self, index: usize, exit_code: Option<i32>, duration_ms: u64) {
        self.finish(index, StepState::Succeeded, exit_code, duration_ms);
    }

    pub fn fail(&mut self, index: usize, exit_code: Option<i32>, duration_ms: u64) {
        self.finish(index, StepState::Failed, exit_code, duration_ms);
    }

    fn finish(&mut self, index: usize, state: StepState, exit_code: Option<i32>, duration_ms: u64) {
        let record = &mut self.records[index];
        debug_assert_eq!(record.state, StepState::Running);
        record.state = state;
        record.exit_code = exit_code;
        record.duration_ms = duration_ms;
    }

    /// Whether a required step failed
    pub fn is_aborted(&self) -> bool {
        self.failed_step().is_some()
    }

    /// The failed required step, if any
    pub fn failed_step(&self) -> Option<(usize, &StepRecord)> {
        self.records
            .iter()
            .enumerate()
            .find(|(_, r)| r.state == StepState::Failed && !r.step.optional)
    }

    /// Whether every required step succeeded
    pub fn is_complete(&self) -> bool {
        self.records
            .iter()
            .all(|r| r.step.optional || r.state == StepState::Succeeded)
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<StepRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildsys::BuildSystemKind;

    fn states(machine: &StepMachine) -> Vec<StepState> {
        machine.records().iter().map(|r| r.state).collect()
    }

    fn command(optional_last: bool) -> BuildCommand {
        let mut install = BuildStep::new("install", "make", "/src").arg("install");
        if optional_last {
            install = install.optional();
        }
        BuildCommand::new(
            BuildSystemKind::Autotools,
            vec![
                BuildStep::new("configure", "./configure", "/src"),
                BuildStep::new("make", "make", "/src"),
                install,
            ],
        )
    }

    #[test]
    fn test_new_machine_is_pending() {
        let machine = StepMachine::new(&command(false));

        assert_eq!(states(&machine), vec![StepState::Pending; 3]);
        assert_eq!(machine.next_pending(), Some(0));
        assert!(!machine.is_complete());
    }

    #[test]
    fn test_running_step_blocks_next() {
        let mut machine = StepMachine::new(&command(false));
        let step = machine.start(0);
        assert_eq!(step.label, "configure");

        assert_eq!(machine.next_pending(), None);
        machine.succeed(0, Some(0), 10);
        assert_eq!(machine.next_pending(), Some(1));
    }

    #[test]
    fn test_all_succeed() {
        let mut machine = StepMachine::new(&command(false));
        while let Some(i) = machine.next_pending() {
            machine.start(i);
            machine.succeed(i, Some(0), 1);
        }

        assert!(machine.is_complete());
        assert!(!machine.is_aborted());
        assert_eq!(states(&machine), vec![StepState::Succeeded; 3]);
    }

    #[test]
    fn test_failure_aborts_remaining_steps() {
        let mut machine = StepMachine::new(&command(false));
        machine.start(0);
        machine.fail(0, Some(1), 5);

        assert!(machine.is_aborted());
        assert_eq!(machine.next_pending(), None);
        assert_eq!(
            states(&machine),
            vec![StepState::Failed, StepState::Pending, StepState::Pending]
        );

        let (index, record) = machine.failed_step().unwrap();
        assert_eq!(index, 0);
        assert_eq!(record.exit_code, Some(1));
    }

    #[test]
    fn test_optional_failure_does_not_abort() {
        let mut machine = StepMachine::new(&command(true));
        for i in 0..2 {
            machine.start(i);
            machine.succeed(i, Some(0), 1);
        }
        machine.start(2);
        machine.fail(2, Some(2), 1);

        assert!(!machine.is_aborted());
        assert!(machine.is_complete());
        assert!(machine.failed_step().is_none());
        assert_eq!(machine.next_pending(), None);
    }
}
