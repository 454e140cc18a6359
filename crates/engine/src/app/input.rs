use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    BasicAttack,
    SpinAttack,
    Dash,
    WaveAttack,
    Interact,
    UsePotion,
    EquipNext,
    Quit,
}

const ACTION_COUNT: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::BasicAttack => 4,
            InputAction::SpinAttack => 5,
            InputAction::Dash => 6,
            InputAction::WaveAttack => 7,
            InputAction::Interact => 8,
            InputAction::UsePotion => 9,
            InputAction::EquipNext => 10,
            InputAction::Quit => 11,
        }
    }
}

/// Discrete intent for one simulation tick. The core never reads devices directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    actions: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_actions(actions: &[InputAction]) -> Self {
        let mut snapshot = Self::empty();
        for action in actions {
            snapshot.actions.set(*action, true);
        }
        snapshot
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn quit_requested(&self) -> bool {
        self.is_down(InputAction::Quit)
    }
}

pub trait InputSource {
    /// Returns `None` once the source has nothing further to supply.
    fn next_snapshot(&mut self) -> Option<InputSnapshot>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputStep {
    pub ticks: u32,
    #[serde(default)]
    pub actions: Vec<InputAction>,
}

#[derive(Debug, Error)]
pub enum InputScriptError {
    #[error("failed to read input script {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid input script at {path}: {message}")]
    Parse { path: String, message: String },
}

/// Replays a fixed list of held-action steps, one snapshot per tick.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    steps: Vec<InputStep>,
    step_index: usize,
    ticks_into_step: u32,
}

impl ScriptedInput {
    pub fn new(steps: Vec<InputStep>) -> Self {
        Self {
            steps,
            step_index: 0,
            ticks_into_step: 0,
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, InputScriptError> {
        let deserializer = &mut serde_json::Deserializer::from_str(raw);
        let steps: Vec<InputStep> =
            serde_path_to_error::deserialize(deserializer).map_err(|error| {
                InputScriptError::Parse {
                    path: error.path().to_string(),
                    message: error.inner().to_string(),
                }
            })?;
        Ok(Self::new(steps))
    }

    pub fn load(path: &Path) -> Result<Self, InputScriptError> {
        let raw = fs::read_to_string(path).map_err(|source| InputScriptError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn total_ticks(&self) -> u64 {
        self.steps.iter().map(|step| u64::from(step.ticks)).sum()
    }
}

impl InputSource for ScriptedInput {
    fn next_snapshot(&mut self) -> Option<InputSnapshot> {
        loop {
            let step = self.steps.get(self.step_index)?;
            if self.ticks_into_step < step.ticks {
                self.ticks_into_step = self.ticks_into_step.saturating_add(1);
                return Some(InputSnapshot::from_actions(&step.actions));
            }
            self.step_index = self.step_index.saturating_add(1);
            self.ticks_into_step = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn snapshot_reports_only_requested_actions() {
        let snapshot = InputSnapshot::from_actions(&[InputAction::MoveLeft, InputAction::Dash]);
        assert!(snapshot.is_down(InputAction::MoveLeft));
        assert!(snapshot.is_down(InputAction::Dash));
        assert!(!snapshot.is_down(InputAction::MoveRight));
        assert!(!snapshot.quit_requested());
    }

    #[test]
    fn with_action_down_can_release() {
        let snapshot = InputSnapshot::empty()
            .with_action_down(InputAction::Quit, true)
            .with_action_down(InputAction::Quit, false);
        assert!(!snapshot.quit_requested());
    }

    #[test]
    fn scripted_input_replays_steps_in_order_then_ends() {
        let mut script = ScriptedInput::new(vec![
            InputStep {
                ticks: 2,
                actions: vec![InputAction::MoveRight],
            },
            InputStep {
                ticks: 0,
                actions: vec![InputAction::Quit],
            },
            InputStep {
                ticks: 1,
                actions: vec![InputAction::BasicAttack],
            },
        ]);
        assert_eq!(script.total_ticks(), 3);

        let first = script.next_snapshot().expect("first");
        let second = script.next_snapshot().expect("second");
        let third = script.next_snapshot().expect("third");
        assert!(first.is_down(InputAction::MoveRight));
        assert!(second.is_down(InputAction::MoveRight));
        assert!(third.is_down(InputAction::BasicAttack));
        assert!(!third.quit_requested());
        assert!(script.next_snapshot().is_none());
    }

    #[test]
    fn scripted_input_parses_snake_case_actions() {
        let script = ScriptedInput::from_json_str(
            r#"[{"ticks": 3, "actions": ["move_up", "wave_attack"]}, {"ticks": 1}]"#,
        )
        .expect("parse");
        assert_eq!(script.total_ticks(), 4);
    }

    #[test]
    fn scripted_input_error_names_json_path() {
        let err = ScriptedInput::from_json_str(r#"[{"ticks": 1, "actions": ["fly"]}]"#)
            .expect_err("unknown action");
        match err {
            InputScriptError::Parse { path, .. } => assert_eq!(path, "[0].actions[0]"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn scripted_input_loads_from_disk() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("script.json");
        fs::write(&path, r#"[{"ticks": 2, "actions": ["interact"]}]"#).expect("write");
        let mut script = ScriptedInput::load(&path).expect("load");
        assert!(script
            .next_snapshot()
            .expect("snapshot")
            .is_down(InputAction::Interact));
    }
}
