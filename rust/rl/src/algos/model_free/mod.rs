pub mod gradient_free;

use crate::error::*;
use crate::policy::{greedy_actions, Policy};
use gridworld::{Action, Continous, Discrete, EpisodeEvent, GridEnvironment, StepInfo};
use ndarray::Array2;
use rand::prelude::*;

/// Something that can be reset and stepped, one discrete action at a time.
pub trait MdpSimulator {
    fn n_s(&self) -> usize;

    fn reset(&mut self) -> Discrete;

    fn step(&mut self, a: Action) -> StepInfo;
}

impl MdpSimulator for GridEnvironment {
    fn n_s(&self) -> usize {
        self.world().n_s()
    }

    fn reset(&mut self) -> Discrete {
        GridEnvironment::reset(self)
    }

    fn step(&mut self, a: Action) -> StepInfo {
        GridEnvironment::step(self, a)
    }
}

pub trait EpisodeGenerator {
    /// One complete episode following `pi`.
    fn generate(&mut self, pi: &Policy, rng: &mut StdRng) -> Result<Vec<EpisodeEvent>>;
}

impl<T: MdpSimulator> EpisodeGenerator for T {
    fn generate(&mut self, pi: &Policy, rng: &mut StdRng) -> Result<Vec<EpisodeEvent>> {
        let mut ep = vec![];
        let mut s = self.reset();
        loop {
            let a = pi.get_action(s, rng);
            let si = self.step(a);
            ep.push(EpisodeEvent { s, a, r: si.reward });
            if si.terminated {
                return Ok(ep);
            }
            check_truncated(&si, ep.len())?;

            s = si.observation;
        }
    }
}

/// A truncated step means the episode never reached a terminal state.
pub(crate) fn check_truncated(si: &StepInfo, steps: usize) -> Result<()> {
    if si.truncated {
        return Err(gridworld::Error::NoTermination(steps).into());
    }

    Ok(())
}

/// Result of a control algorithm: the learnt action values and the greedy
/// deterministic policy over them.
#[derive(Debug, Clone)]
pub struct Control {
    pub policy: Policy,
    pub q: Array2<Continous>,
}

impl Control {
    pub fn from_q(q: Array2<Continous>) -> Self {
        Self {
            policy: Policy::deterministic(&greedy_actions(&q)),
            q,
        }
    }
}
