use super::{common::*, Mdp, MdpSolver};
use crate::error::*;
use crate::policy::{argmax, Policy};
use gridworld::{Action, Continous, Discrete};
use itertools::Itertools;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How each policy-iteration round evaluates the current policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyEvaluation {
    /// At most `sweeps` sweeps of iterative policy evaluation from zero.
    Iterative { sweeps: usize },
    /// Solve the linear system of the policy.
    Exact,
}

impl Default for PolicyEvaluation {
    fn default() -> Self {
        Self::Iterative { sweeps: 20 }
    }
}

/// Relative margin by which an action must beat the current one to replace it.
pub const IMPROVEMENT_TOLERANCE: Continous = 1e-9;

/// Policy iteration - Sutton & Barto 2018, 4.3.
///
/// `exec` reports whether the policy became stable within the round budget.
/// Improvement keeps the current action unless another is better by more than
/// [`IMPROVEMENT_TOLERANCE`], so rounding noise between tied actions cannot
/// make the policy cycle.
pub struct PolicyIteration<'a> {
    mdp: &'a dyn Mdp,
    evaluation: PolicyEvaluation,
    policy: Policy,
    v: Array1<Continous>,
    q: Array2<Continous>,
}

impl<'a> PolicyIteration<'a> {
    pub fn new(mdp: &'a dyn Mdp, evaluation: PolicyEvaluation) -> Self {
        Self {
            mdp,
            evaluation,
            policy: Policy::deterministic(&vec![Action::Up; mdp.n_s()]),
            v: Array1::zeros(mdp.n_s()),
            q: Array2::zeros((mdp.n_s(), mdp.n_a())),
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn values(&self) -> &Array1<Continous> {
        &self.v
    }

    fn evaluate(&self, theta: Continous) -> Result<Array1<Continous>> {
        match self.evaluation {
            PolicyEvaluation::Iterative { sweeps } => {
                Ok(evaluate_policy(self.mdp, &self.policy, theta, sweeps, None))
            }
            PolicyEvaluation::Exact => self.mdp.policy_value_system(&self.policy),
        }
    }

    fn improve(&self) -> Policy {
        let actions = self
            .q
            .outer_iter()
            .enumerate()
            .map(|(s, row)| {
                let current = argmax(self.policy.table().row(s));
                let best = argmax(row);
                let kept = row[current.index()];
                if row[best.index()] > kept + IMPROVEMENT_TOLERANCE * kept.abs().max(1.) {
                    best
                } else {
                    current
                }
            })
            .collect_vec();

        Policy::deterministic(&actions)
    }
}

impl MdpSolver<bool> for PolicyIteration<'_> {
    fn v_star(&self, s: Discrete) -> Continous {
        self.v[s]
    }

    fn q_star(&self, s: Discrete, a: Action) -> Continous {
        self.q[[s, a.index()]]
    }

    fn pi_star(&self, s: Discrete) -> Action {
        argmax(self.policy.table().row(s))
    }

    /// `theta` only stops the iterative evaluation early. Without a round
    /// budget, iteration goes on until the policy is stable.
    fn exec(&mut self, theta: Continous, num_iterations: Option<usize>) -> Result<(bool, usize)> {
        let mut i = 0;
        loop {
            if num_iterations.is_some_and(|n| i >= n) {
                return Ok((false, i));
            }

            self.v = self.evaluate(theta)?;
            self.q = q_from_v(self.mdp, &self.v);
            let improved = self.improve();
            i += 1;

            let stable = improved == self.policy;
            debug!(round = i, stable, "policy iteration round");
            self.policy = improved;
            if stable {
                return Ok((true, i));
            }
        }
    }
}
