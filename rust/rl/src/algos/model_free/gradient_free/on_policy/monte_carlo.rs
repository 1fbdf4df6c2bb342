use crate::algos::model_free::{Control, EpisodeGenerator};
use crate::error::*;
use crate::policy::{greedy_actions, Policy};
use gridworld::{Continous, Discrete, EpisodeEvent, N_ACTIONS};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use tracing::debug;

/// Ref: https://youtu.be/P0ZvxeQqv0A?si=RLKdOUTNEfKXE63C
pub fn mc_first_visit(
    ep_gen: &mut dyn EpisodeGenerator,
    pi: &Policy,
    gamma: Continous,
    n_ep: usize,
    rng: &mut StdRng,
) -> Result<Array1<Continous>> {
    mc_core(ep_gen, pi, gamma, n_ep, rng, is_first_visit)
}

/// Ref: https://youtu.be/P0ZvxeQqv0A?si=RLKdOUTNEfKXE63C
pub fn mc_every_visit(
    ep_gen: &mut dyn EpisodeGenerator,
    pi: &Policy,
    gamma: Continous,
    n_ep: usize,
    rng: &mut StdRng,
) -> Result<Array1<Continous>> {
    mc_core(ep_gen, pi, gamma, n_ep, rng, |_, _| true)
}

/// `V(s) = S(s) / N(s)` over the visits `counts` accepts. Unvisited states stay 0.
fn mc_core(
    ep_gen: &mut dyn EpisodeGenerator,
    pi: &Policy,
    gamma: Continous,
    n_ep: usize,
    rng: &mut StdRng,
    counts: fn(&[EpisodeEvent], usize) -> bool,
) -> Result<Array1<Continous>> {
    let mut returns = Array1::<Continous>::zeros(pi.n_s());
    let mut visits = Array1::<Continous>::zeros(pi.n_s());

    for _ in 0..n_ep {
        let ep = ep_gen.generate(pi, rng)?;
        for (t, g) in discounted_returns(&ep, gamma).into_iter().enumerate() {
            if counts(&ep, t) {
                returns[ep[t].s] += g;
                visits[ep[t].s] += 1.;
            }
        }
    }

    Ok(returns
        .iter()
        .zip(&visits)
        .map(|(&r, &v)| if v == 0. { 0. } else { r / v })
        .collect())
}

/// After each episode, `V(s_t) += alpha * (G_t - V(s_t))` for every step.
pub fn mc_incremental(
    ep_gen: &mut dyn EpisodeGenerator,
    pi: &Policy,
    gamma: Continous,
    alpha: Continous,
    n_ep: usize,
    rng: &mut StdRng,
) -> Result<Array1<Continous>> {
    let mut v = Array1::zeros(pi.n_s());
    for _ in 0..n_ep {
        let ep = ep_gen.generate(pi, rng)?;
        for (e, g) in ep.iter().zip(discounted_returns(&ep, gamma)) {
            v[e.s] += alpha * (g - v[e.s]);
        }
    }

    Ok(v)
}

/// Monte-Carlo control with a GLIE behaviour policy.
///
/// Every-visit averages `Q(s, a) += (G_t - Q(s, a)) / N(s, a)`; after episode
/// `k` the behaviour policy becomes e-greedy over `Q` with `e = 1/k`.
pub fn glie_control(
    ep_gen: &mut dyn EpisodeGenerator,
    n_s: usize,
    gamma: Continous,
    n_ep: usize,
    policy: Option<Policy>,
    rng: &mut StdRng,
) -> Result<Control> {
    let mut n = Array2::<Continous>::zeros((n_s, N_ACTIONS));
    let mut q = Array2::zeros((n_s, N_ACTIONS));
    let mut pi = policy.unwrap_or_else(|| Policy::uniform(n_s));

    for k in 1..=n_ep {
        let ep = ep_gen.generate(&pi, rng)?;
        for (e, g) in ep.iter().zip(discounted_returns(&ep, gamma)) {
            let sa = [e.s, e.a.index()];
            n[sa] += 1.;
            q[sa] += (g - q[sa]) / n[sa];
        }

        pi = Policy::egreedy(&greedy_actions(&q), 1. / k as Continous);
        debug!(episode = k, steps = ep.len(), "glie episode");
    }

    Ok(Control::from_q(q))
}

/// `G_t = r_t + gamma * G_t+1`, accumulated backwards.
pub fn discounted_returns(ep: &[EpisodeEvent], gamma: Continous) -> Vec<Continous> {
    let mut g = 0.;
    let mut returns = vec![0.; ep.len()];
    for t in (0..ep.len()).rev() {
        g = ep[t].r + gamma * g;
        returns[t] = g;
    }

    returns
}

fn is_first_visit(ep: &[EpisodeEvent], t: usize) -> bool {
    let s: Discrete = ep[t].s;
    !ep.iter().take(t).any(|x| x.s == s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::*;
    use gridworld::Action;

    /// Replays the same episodes in order, whatever the policy.
    struct ScriptedEpisodes {
        episodes: Vec<Vec<EpisodeEvent>>,
        next: usize,
    }

    impl EpisodeGenerator for ScriptedEpisodes {
        fn generate(&mut self, _pi: &Policy, _rng: &mut StdRng) -> Result<Vec<EpisodeEvent>> {
            let ep = self.episodes[self.next % self.episodes.len()].clone();
            self.next += 1;
            Ok(ep)
        }
    }

    fn ev(s: Discrete, r: Continous) -> EpisodeEvent {
        EpisodeEvent {
            s,
            a: Action::Right,
            r,
        }
    }

    fn toy_episodes() -> ScriptedEpisodes {
        ScriptedEpisodes {
            episodes: vec![
                vec![ev(1, -2.), ev(4, -1.), ev(1, -3.), ev(2, -1.)],
                vec![ev(1, 0.)],
                vec![ev(2, 0.)],
            ],
            next: 0,
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    #[test]
    fn toy_example_with_first_vist() {
        let v = mc_first_visit(&mut toy_episodes(), &Policy::uniform(6), 0.9, 3, &mut rng()).unwrap();

        assert_float_eq!(
            v.to_vec(),
            vec![0., (-6.059 / 2.0), (-1. / 2.0), 0., -4.51, 0.],
            abs_all <= 1e-5
        );
    }

    #[test]
    fn toy_example_with_every_vist() {
        let v = mc_every_visit(&mut toy_episodes(), &Policy::uniform(6), 0.9, 3, &mut rng()).unwrap();

        assert_float_eq!(
            v.to_vec(),
            vec![
                0.,
                ((-6.059 + -3.0 + -0.9) / 3.0),
                (-1. / 2.0),
                0.,
                -4.51,
                0.
            ],
            abs_all <= 1e-5
        );
    }

    #[test]
    fn toy_example_incremental() {
        let v = mc_incremental(&mut toy_episodes(), &Policy::uniform(6), 0.9, 0.5, 1, &mut rng())
            .unwrap();

        // State 1 is updated twice within the episode, the later visit last.
        let v1 = 0.5 * -6.059;
        let v1 = v1 + 0.5 * (-3.9 - v1);
        assert_float_eq!(
            v.to_vec(),
            vec![0., v1, -0.5, 0., -4.51 / 2., 0.],
            abs_all <= 1e-9
        );
    }

    #[test]
    fn returns_are_discounted_backwards() {
        let ep = [ev(0, 1.), ev(1, 2.), ev(2, 4.)];

        assert_float_eq!(
            discounted_returns(&ep, 0.5),
            vec![1. + 0.5 * (2. + 0.5 * 4.), 2. + 0.5 * 4., 4.],
            abs_all <= 1e-12
        );
        assert!(discounted_returns(&[], 0.5).is_empty());
    }

    #[test]
    fn glie_averages_action_returns() {
        let mut episodes = ScriptedEpisodes {
            episodes: vec![
                vec![
                    EpisodeEvent {
                        s: 0,
                        a: Action::Down,
                        r: -1.,
                    },
                    ev(1, 10.),
                ],
                vec![ev(0, 4.)],
            ],
            next: 0,
        };

        let control = glie_control(&mut episodes, 2, 1., 2, None, &mut rng()).unwrap();

        assert_float_eq!(control.q[[0, Action::Down.index()]], 9., abs <= 1e-12);
        assert_float_eq!(control.q[[0, Action::Right.index()]], 4., abs <= 1e-12);
        assert_float_eq!(control.q[[1, Action::Right.index()]], 10., abs <= 1e-12);
        assert_eq!(
            control.policy,
            Policy::deterministic(&[Action::Down, Action::Right])
        );
    }
}
