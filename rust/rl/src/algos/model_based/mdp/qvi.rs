use super::{check_budget, Mdp, MdpSolver};
use crate::error::*;
use crate::policy::argmax;
use gridworld::{Action, Continous, Discrete};
use ndarray::{s, Array1, Array2, Axis, Zip};
use tracing::debug;

/// Value iteration on action values.
///
/// `Q_k+1(s, a) = sum_s' P(a, s, s') (reward(s') + gamma * max_a' Q_k(s', a'))`,
/// which is `R(a, s) + gamma * sum_s' P(a, s, s') max_a' Q_k(s', a')`.
pub struct QValueIteration<'a> {
    mdp: &'a dyn Mdp,
    q: Array2<Continous>,
}

impl<'a> QValueIteration<'a> {
    pub fn new(mdp: &'a dyn Mdp) -> Self {
        Self {
            mdp,
            q: Array2::zeros((mdp.n_s(), mdp.n_a())),
        }
    }

    pub fn q_values(&self) -> &Array2<Continous> {
        &self.q
    }

    fn greedy_values(&self) -> Array1<Continous> {
        self.q
            .map_axis(Axis(1), |row| row.fold(Continous::NEG_INFINITY, |m, &q| m.max(q)))
    }

    fn sweep(&self) -> Array2<Continous> {
        let v = self.greedy_values();
        Array2::from_shape_fn(self.q.dim(), |(s, a)| {
            if self.mdp.is_absorbing(s) {
                0.
            } else {
                self.mdp.r()[[a, s]] + self.mdp.gamma() * self.mdp.p().slice(s![a, s, ..]).dot(&v)
            }
        })
    }
}

impl MdpSolver<bool> for QValueIteration<'_> {
    fn v_star(&self, s: Discrete) -> Continous {
        self.q
            .row(s)
            .fold(Continous::NEG_INFINITY, |m, &q| m.max(q))
    }

    fn q_star(&self, s: Discrete, a: Action) -> Continous {
        self.q[[s, a.index()]]
    }

    fn pi_star(&self, s: Discrete) -> Action {
        argmax(self.q.row(s))
    }

    fn exec(&mut self, theta: Continous, num_iterations: Option<usize>) -> Result<(bool, usize)> {
        check_budget(theta, num_iterations)?;

        let mut i = 0;
        loop {
            if num_iterations.is_some_and(|n| i >= n) {
                return Ok((false, i));
            }

            let next = self.sweep();
            let delta = Zip::from(&self.q)
                .and(&next)
                .fold(0., |acc: Continous, a, b| acc.max((a - b).abs()));
            self.q = next;
            i += 1;

            if theta > 0. && delta <= theta {
                debug!(sweeps = i, delta, "q-value iteration converged");
                return Ok((true, i));
            }
        }
    }
}
