use crate::error::*;
use gridworld::{Action, Continous, Discrete, GridEnvironment, N_ACTIONS};
use itertools::Itertools;
use ndarray::{Array2, ArrayView1};
use rand::prelude::*;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Tolerance on the sum of a policy row.
pub const ROW_TOLERANCE: Continous = 1e-9;

/// Stochastic policy: `table[[s, a]]` is the probability of taking `a` in `s`.
///
/// Immutable once built. Each row's actions are pre-sorted by descending
/// probability, which is the order [`Policy::get_action`] walks them in.
#[derive(Debug, Clone)]
pub struct Policy {
    table: Array2<Continous>,
    order: Vec<Vec<usize>>,
}

impl Policy {
    pub fn new(table: Array2<Continous>) -> Result<Self> {
        if table.ncols() != N_ACTIONS {
            return Err(Error::InvalidPolicy(format!(
                "expected {N_ACTIONS} actions per state, got {}",
                table.ncols()
            )));
        }

        for (s, row) in table.outer_iter().enumerate() {
            if row.iter().any(|p| !(0. ..=1.).contains(p)) {
                return Err(Error::InvalidPolicy(format!(
                    "state {s} has a probability outside [0, 1]"
                )));
            }

            let total = row.sum();
            if (total - 1.).abs() > ROW_TOLERANCE {
                return Err(Error::InvalidPolicy(format!(
                    "probabilities of state {s} sum to {total}"
                )));
            }
        }

        Ok(Self::from_table(table))
    }

    fn from_table(table: Array2<Continous>) -> Self {
        let order = table
            .outer_iter()
            .map(|row| {
                (0..N_ACTIONS)
                    .sorted_by(|&i, &j| row[j].total_cmp(&row[i]))
                    .collect()
            })
            .collect();

        Self { table, order }
    }

    /// Probability 1 on the assigned action of every state.
    pub fn deterministic(assignment: &[Action]) -> Self {
        let mut table = Array2::zeros((assignment.len(), N_ACTIONS));
        for (s, a) in assignment.iter().enumerate() {
            table[[s, a.index()]] = 1.;
        }

        Self::from_table(table)
    }

    /// `1 - e + e/4` on the assigned action, `e/4` on the others.
    pub fn egreedy(assignment: &[Action], e: Continous) -> Self {
        debug_assert!((0. ..=1.).contains(&e), "epsilon {e} outside [0, 1]");

        let spread = e / N_ACTIONS as Continous;
        let mut table = Array2::from_elem((assignment.len(), N_ACTIONS), spread);
        for (s, a) in assignment.iter().enumerate() {
            table[[s, a.index()]] = 1. - e + spread;
        }

        Self::from_table(table)
    }

    pub fn uniform(n_s: usize) -> Self {
        Self::from_table(Array2::from_elem(
            (n_s, N_ACTIONS),
            1. / N_ACTIONS as Continous,
        ))
    }

    /// Random rows, normalised.
    pub fn random(n_s: usize, rng: &mut StdRng) -> Self {
        let mut table = Array2::from_shape_simple_fn((n_s, N_ACTIONS), || {
            rng.gen_range(Continous::EPSILON..1.)
        });
        for mut row in table.outer_iter_mut() {
            let total = row.sum();
            row /= total;
        }

        Self::from_table(table)
    }

    pub fn n_s(&self) -> usize {
        self.table.nrows()
    }

    pub fn table(&self) -> &Array2<Continous> {
        &self.table
    }

    pub fn prob(&self, s: Discrete, a: Action) -> Continous {
        self.table[[s, a.index()]]
    }

    /// Samples an action for `s`.
    pub fn get_action(&self, s: Discrete, rng: &mut StdRng) -> Action {
        let val: Continous = rng.gen();
        let mut acc = 0.;
        let mut chosen = self.order[s][0];
        for &a in &self.order[s] {
            let p = self.table[[s, a]];
            if p == 0. {
                break;
            }

            chosen = a;
            acc += p;
            if val < acc {
                break;
            }
        }

        Action::from_index(chosen)
    }

    /// Plays one episode and returns its score.
    pub fn play_game(&self, env: &mut GridEnvironment, rng: &mut StdRng) -> Result<Continous> {
        env.reset();
        loop {
            let si = env.step(self.get_action(env.state(), rng));
            if si.terminated {
                break;
            }
            if si.truncated {
                return Err(gridworld::Error::NoTermination(env.steps()).into());
            }
        }

        debug!(score = env.score(), steps = env.steps(), "game played");
        Ok(env.score())
    }

    pub fn play_games(
        &self,
        env: &mut GridEnvironment,
        n: usize,
        rng: &mut StdRng,
    ) -> Result<ScoreSummary> {
        if n == 0 {
            return Err(Error::Config("at least one game must be played".into()));
        }

        let mut summary = ScoreSummary {
            min: Continous::INFINITY,
            mean: 0.,
            max: Continous::NEG_INFINITY,
        };
        for _ in 0..n {
            let score = self.play_game(env, rng)?;
            summary.min = summary.min.min(score);
            summary.max = summary.max.max(score);
            summary.mean += score;
        }
        summary.mean /= n as Continous;

        Ok(summary)
    }
}

impl PartialEq for Policy {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.table.outer_iter().enumerate().map(|(s, row)| {
            format!("{s}: {}", row.iter().map(|p| format!("{p:.4}")).join(" "))
        });
        write!(f, "{}", rows.format("\n"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub min: Continous,
    pub mean: Continous,
    pub max: Continous,
}

impl fmt::Display for ScoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "min = {}\nav  = {}\nmax = {}", self.min, self.mean, self.max)
    }
}

/// First action with the highest value.
pub fn argmax(row: ArrayView1<Continous>) -> Action {
    let mut best = 0;
    for (a, q) in row.iter().enumerate().skip(1) {
        if *q > row[best] {
            best = a;
        }
    }

    Action::from_index(best)
}

/// Per-state argmax of a `[s, a]` table.
pub fn greedy_actions(q: &Array2<Continous>) -> Vec<Action> {
    q.outer_iter().map(argmax).collect()
}

/// With probability `e` a uniformly random action, otherwise the greedy one.
pub fn egreedy_action(
    q: &Array2<Continous>,
    s: Discrete,
    e: Continous,
    rng: &mut StdRng,
) -> Action {
    if rng.gen::<Continous>() < e {
        Action::ALL[rng.gen_range(0..N_ACTIONS)]
    } else {
        argmax(q.row(s))
    }
}
