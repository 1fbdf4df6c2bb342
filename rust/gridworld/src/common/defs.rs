use serde::{Deserialize, Serialize};
use std::fmt;

pub type Discrete = usize;
pub type Continous = f64;

pub const N_ACTIONS: usize = 4;

/// The four moves available to every mover on the grid.
/// The discriminants are the action indices used by every table in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Action {
    pub const ALL: [Action; N_ACTIONS] = [Action::Up, Action::Down, Action::Left, Action::Right];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Panics if `i` is not a valid action index.
    pub fn from_index(i: usize) -> Self {
        assert!(i < N_ACTIONS, "action index {i} out of range");
        Self::ALL[i]
    }

    /// (dx, dy) with y growing downwards.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::Up => (0, -1),
            Action::Down => (0, 1),
            Action::Left => (-1, 0),
            Action::Right => (1, 0),
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Action::Up => Action::Down,
            Action::Down => Action::Up,
            Action::Left => Action::Right,
            Action::Right => Action::Left,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Up => "UP",
            Action::Down => "DOWN",
            Action::Left => "LEFT",
            Action::Right => "RIGHT",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    pub observation: Discrete,
    pub reward: Continous,
    pub terminated: bool,
    pub truncated: bool,
}

/// One step of an episode: the state left, the action taken there and the
/// reward received for it.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct EpisodeEvent {
    pub s: Discrete,
    pub a: Action,
    pub r: Continous,
}
