pub mod common;
pub mod pi;
pub mod qvi;
pub mod vi;

use crate::{error::*, math, policy::Policy};
use gridworld::{Action, Continous, Discrete};
use ndarray::{Array1, Array2, Array3, Axis};

/// Markov Decision Process - Sutton & Barto 2018.
///
/// `p()[[a, s, s2]]` is the probability of reaching `s2` when intending `a`
/// in `s`, `r()[[a, s]]` the expected reward of that move. Absorbing states
/// have all-zero rows in both.
pub trait Mdp {
    fn n_s(&self) -> usize;

    fn n_a(&self) -> usize;

    fn gamma(&self) -> Continous;

    fn p(&self) -> &Array3<Continous>;

    fn r(&self) -> &Array2<Continous>;

    fn is_absorbing(&self, s: Discrete) -> bool;

    /// `P_pi(s, s') = sum_a pi(a|s) P(a, s, s')`.
    fn p_policy(&self, pi: &Policy) -> Array2<Continous> {
        let mut p_pi = Array2::zeros((self.n_s(), self.n_s()));
        for (a, p_a) in self.p().axis_iter(Axis(0)).enumerate() {
            let weights = pi.table().column(a).insert_axis(Axis(1));
            p_pi += &(&p_a * &weights);
        }

        p_pi
    }

    /// `R_pi(s) = sum_a pi(a|s) R(a, s)`.
    fn r_policy(&self, pi: &Policy) -> Array1<Continous> {
        (self.r().t().to_owned() * pi.table()).sum_axis(Axis(1))
    }

    /// Exact value of `pi`: `v = (I - gamma P_pi)^-1 r_pi`.
    fn policy_value_system(&self, pi: &Policy) -> Result<Array1<Continous>> {
        let system = Array2::<Continous>::eye(self.n_s()) - self.p_policy(pi) * self.gamma();
        math::solve(system, self.r_policy(pi))
    }
}

pub trait MdpSolver<T> {
    fn v_star(&self, s: Discrete) -> Continous;

    fn q_star(&self, s: Discrete, a: Action) -> Continous;

    fn pi_star(&self, s: Discrete) -> Action;

    /// Runs at most `num_iterations` sweeps. A positive `theta` also stops as
    /// soon as a sweep changes no value by more than `theta`.
    fn exec(&mut self, theta: Continous, num_iterations: Option<usize>) -> Result<(T, usize)>;
}

/// Deterministic policy following the solver's `pi_star`.
pub fn solver_policy<T>(solver: &dyn MdpSolver<T>, n_s: usize) -> Policy {
    let actions: Vec<_> = (0..n_s).map(|s| solver.pi_star(s)).collect();
    Policy::deterministic(&actions)
}

/// Iteration budget check shared by the solvers.
pub(crate) fn check_budget(theta: Continous, num_iterations: Option<usize>) -> Result<()> {
    if theta <= 0. && num_iterations.is_none() {
        return Err(Error::Config(
            "either a positive theta or an iteration count is required".into(),
        ));
    }

    Ok(())
}
