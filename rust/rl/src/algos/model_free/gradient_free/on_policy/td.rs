use crate::algos::model_free::{check_truncated, Control, MdpSimulator};
use crate::error::*;
use crate::policy::{egreedy_action, Policy};
use gridworld::{Action, Continous, Discrete, N_ACTIONS};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use tracing::debug;

/// TD(0) evaluation of `pi`: `V(s) += alpha * (r + gamma * V(s') - V(s))`.
pub fn td0(
    sim: &mut dyn MdpSimulator,
    pi: &Policy,
    gamma: Continous,
    alpha: Continous,
    n_ep: usize,
    rng: &mut StdRng,
) -> Result<Array1<Continous>> {
    let mut v = Array1::<Continous>::zeros(sim.n_s());
    for _ in 0..n_ep {
        let mut s = sim.reset();
        let mut steps = 0;
        loop {
            let si = sim.step(pi.get_action(s, rng));
            steps += 1;

            let next = if si.terminated { 0. } else { v[si.observation] };
            v[s] += alpha * (si.reward + gamma * next - v[s]);
            if si.terminated {
                break;
            }
            check_truncated(&si, steps)?;

            s = si.observation;
        }
    }

    Ok(v)
}

/// SARSA(0): on-policy TD control, e-greedy with `e = 1/k` in episode `k`.
pub fn sarsa(
    sim: &mut dyn MdpSimulator,
    gamma: Continous,
    alpha: Continous,
    n_ep: usize,
    rng: &mut StdRng,
) -> Result<Control> {
    let mut q = Array2::<Continous>::zeros((sim.n_s(), N_ACTIONS));
    for k in 1..=n_ep {
        let e = 1. / k as Continous;
        let mut s = sim.reset();
        let mut a = egreedy_action(&q, s, e, rng);
        let mut steps = 0;
        loop {
            let si = sim.step(a);
            steps += 1;

            let s2 = si.observation;
            let a2 = egreedy_action(&q, s2, e, rng);
            let next = if si.terminated { 0. } else { q[[s2, a2.index()]] };
            q[[s, a.index()]] += alpha * (si.reward + gamma * next - q[[s, a.index()]]);
            if si.terminated {
                break;
            }
            check_truncated(&si, steps)?;

            (s, a) = (s2, a2);
        }
        debug!(episode = k, steps, "sarsa episode");
    }

    Ok(Control::from_q(q))
}

/// Accumulating eligibility traces over the whole `(s, a)` table.
///
/// Each update moves all of `Q` by `alpha * err * E` and then decays all of
/// `E` by `gamma * lambda`.
#[derive(Debug, Clone)]
pub struct TracedQ {
    q: Array2<Continous>,
    traces: Array2<Continous>,
    gamma: Continous,
    alpha: Continous,
    lambda: Continous,
}

impl TracedQ {
    pub fn new(n_s: usize, gamma: Continous, alpha: Continous, lambda: Continous) -> Self {
        Self {
            q: Array2::zeros((n_s, N_ACTIONS)),
            traces: Array2::zeros((n_s, N_ACTIONS)),
            gamma,
            alpha,
            lambda,
        }
    }

    pub fn q(&self) -> &Array2<Continous> {
        &self.q
    }

    pub fn start_episode(&mut self) {
        self.traces.fill(0.);
    }

    /// `next` is the following state-action pair, `None` once the episode is over.
    pub fn update(&mut self, s: Discrete, a: Action, r: Continous, next: Option<(Discrete, Action)>) {
        let bootstrap = next.map_or(0., |(s2, a2)| self.q[[s2, a2.index()]]);
        let err = r + self.gamma * bootstrap - self.q[[s, a.index()]];

        self.traces[[s, a.index()]] += 1.;
        self.q.scaled_add(self.alpha * err, &self.traces);
        self.traces *= self.gamma * self.lambda;
    }

    pub fn into_q(self) -> Array2<Continous> {
        self.q
    }
}

/// SARSA(lambda), e-greedy with `e = 1/k` in episode `k`. Traces start from
/// zero every episode.
pub fn sarsa_lambda(
    sim: &mut dyn MdpSimulator,
    gamma: Continous,
    alpha: Continous,
    lambda: Continous,
    n_ep: usize,
    rng: &mut StdRng,
) -> Result<Control> {
    let mut learner = TracedQ::new(sim.n_s(), gamma, alpha, lambda);
    for k in 1..=n_ep {
        let e = 1. / k as Continous;
        learner.start_episode();
        let mut s = sim.reset();
        let mut a = egreedy_action(learner.q(), s, e, rng);
        let mut steps = 0;
        loop {
            let si = sim.step(a);
            steps += 1;

            let s2 = si.observation;
            let a2 = egreedy_action(learner.q(), s2, e, rng);
            let next = (!si.terminated).then_some((s2, a2));
            learner.update(s, a, si.reward, next);
            if si.terminated {
                break;
            }
            check_truncated(&si, steps)?;

            (s, a) = (s2, a2);
        }
        debug!(episode = k, steps, "sarsa(lambda) episode");
    }

    Ok(Control::from_q(learner.into_q()))
}
