use super::{check_budget, common::*, Mdp, MdpSolver};
use crate::error::*;
use gridworld::{Action, Continous, Discrete};
use ndarray::Array1;
use tracing::debug;

/// Value iteration - Sutton & Barto 2018, 4.4.
///
/// `exec` reports whether the last sweep moved no value by more than `theta`.
pub struct ValueIteration<'a> {
    mdp: &'a dyn Mdp,
    v: Array1<Continous>,
}

impl<'a> ValueIteration<'a> {
    pub fn new(mdp: &'a dyn Mdp) -> Self {
        Self {
            mdp,
            v: Array1::zeros(mdp.n_s()),
        }
    }

    pub fn values(&self) -> &Array1<Continous> {
        &self.v
    }

    fn sweep(&self) -> Array1<Continous> {
        Array1::from_shape_fn(self.mdp.n_s(), |s| {
            if self.mdp.is_absorbing(s) {
                return 0.;
            }

            Action::ALL
                .iter()
                .map(|&a| backup(self.mdp, &self.v, s, a))
                .fold(Continous::NEG_INFINITY, Continous::max)
        })
    }
}

impl MdpSolver<bool> for ValueIteration<'_> {
    fn v_star(&self, s: Discrete) -> Continous {
        self.v[s]
    }

    fn q_star(&self, s: Discrete, a: Action) -> Continous {
        if self.mdp.is_absorbing(s) {
            0.
        } else {
            backup(self.mdp, &self.v, s, a)
        }
    }

    fn pi_star(&self, s: Discrete) -> Action {
        let mut best = Action::Up;
        for a in Action::ALL.into_iter().skip(1) {
            if self.q_star(s, a) > self.q_star(s, best) {
                best = a;
            }
        }

        best
    }

    fn exec(&mut self, theta: Continous, num_iterations: Option<usize>) -> Result<(bool, usize)> {
        check_budget(theta, num_iterations)?;

        let mut i = 0;
        loop {
            if num_iterations.is_some_and(|n| i >= n) {
                return Ok((false, i));
            }

            let next = self.sweep();
            let delta = max_delta(&self.v, &next);
            self.v = next;
            i += 1;

            if theta > 0. && delta <= theta {
                debug!(sweeps = i, delta, "value iteration converged");
                return Ok((true, i));
            }
        }
    }
}
