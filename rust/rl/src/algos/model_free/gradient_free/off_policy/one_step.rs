use crate::algos::model_free::{check_truncated, Control, MdpSimulator};
use crate::error::*;
use crate::policy::egreedy_action;
use gridworld::{Continous, N_ACTIONS};
use ndarray::Array2;
use rand::prelude::*;
use tracing::debug;

/// One-step off-policy TD control.
///
/// Behaves e-greedily over `Q` with `e = 1/t` in episode `t`, and bootstraps
/// from the greedy target `max_a' Q(s', a')`.
pub fn off_policy_one_step(
    sim: &mut dyn MdpSimulator,
    gamma: Continous,
    alpha: Continous,
    n_ep: usize,
    rng: &mut StdRng,
) -> Result<Control> {
    let mut q = Array2::<Continous>::zeros((sim.n_s(), N_ACTIONS));
    for t in 1..=n_ep {
        let e = 1. / t as Continous;
        let mut s = sim.reset();
        let mut steps = 0;
        loop {
            let a = egreedy_action(&q, s, e, rng);
            let si = sim.step(a);
            steps += 1;

            let s2 = si.observation;
            let target = if si.terminated {
                0.
            } else {
                q.row(s2).fold(Continous::NEG_INFINITY, |m, &x| m.max(x))
            };
            q[[s, a.index()]] += alpha * (si.reward + gamma * target - q[[s, a.index()]]);
            if si.terminated {
                break;
            }
            check_truncated(&si, steps)?;

            s = s2;
        }
        debug!(episode = t, steps, "off-policy episode");
    }

    Ok(Control::from_q(q))
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::*;
    use gridworld::{Action, GridEnvironment, World};

    #[test]
    fn learns_the_shortest_path() {
        let world = World::from_rows(1., &["S..", "WW.", "..G"]).unwrap();
        let env = &mut GridEnvironment::new(world, 11).with_max_episode_steps(10_000);

        let control =
            off_policy_one_step(env, 1., 0.5, 500, &mut StdRng::seed_from_u64(5)).unwrap();

        assert_eq!(control.policy.prob(0, Action::Right), 1.);
        assert_eq!(control.policy.prob(1, Action::Right), 1.);
        assert_eq!(control.policy.prob(2, Action::Down), 1.);
        assert_eq!(control.policy.prob(5, Action::Down), 1.);
        assert_float_eq!(control.q[[5, Action::Down.index()]], 1000., abs <= 1.);
    }

    #[test]
    fn stops_on_missing_termination() {
        // The goal is walled off.
        let world = World::from_rows(1., &["S.W", "WWG"]).unwrap();
        let env = &mut GridEnvironment::new(world, 0).with_max_episode_steps(100);

        assert!(matches!(
            off_policy_one_step(env, 1., 0.5, 1, &mut StdRng::seed_from_u64(0)),
            Err(Error::World(gridworld::Error::NoTermination(100)))
        ));
    }
}
