use super::Mdp;
use crate::policy::Policy;
use gridworld::{Action, Continous, Discrete};
use ndarray::{s, Array1, Array2, Zip};

/// One-step lookahead: `R(a, s) + gamma * sum_s' P(a, s, s') v(s')`.
pub fn backup(mdp: &dyn Mdp, v: &Array1<Continous>, s: Discrete, a: Action) -> Continous {
    let a = a.index();
    mdp.r()[[a, s]] + mdp.gamma() * mdp.p().slice(s![a, s, ..]).dot(v)
}

/// `q(s, a)` from `v`, zero on absorbing states.
pub fn q_from_v(mdp: &dyn Mdp, v: &Array1<Continous>) -> Array2<Continous> {
    Array2::from_shape_fn((mdp.n_s(), mdp.n_a()), |(s, a)| {
        if mdp.is_absorbing(s) {
            0.
        } else {
            backup(mdp, v, s, Action::from_index(a))
        }
    })
}

/// Largest absolute change between two sweeps.
pub fn max_delta(old: &Array1<Continous>, new: &Array1<Continous>) -> Continous {
    Zip::from(old)
        .and(new)
        .fold(0., |acc: Continous, a, b| acc.max((a - b).abs()))
}

/// `k` sweeps of `v_k+1(s) = sum_a pi(a|s) (R(a, s) + gamma * sum_s' P(a, s, s') v_k(s'))`,
/// starting from `v0` or zeros.
pub fn iterative_policy_evaluation(
    mdp: &dyn Mdp,
    pi: &Policy,
    k: usize,
    v0: Option<Array1<Continous>>,
) -> Array1<Continous> {
    evaluate_policy(mdp, pi, 0., k, v0)
}

/// Same as [`iterative_policy_evaluation`], also stopping once a sweep moves no
/// value by more than a positive `theta`.
pub fn evaluate_policy(
    mdp: &dyn Mdp,
    pi: &Policy,
    theta: Continous,
    k: usize,
    v0: Option<Array1<Continous>>,
) -> Array1<Continous> {
    let mut v = v0.unwrap_or_else(|| Array1::zeros(mdp.n_s()));
    for _ in 0..k {
        let next = Array1::from_shape_fn(mdp.n_s(), |s| {
            if mdp.is_absorbing(s) {
                return 0.;
            }
            Action::ALL
                .iter()
                .map(|&a| pi.prob(s, a) * backup(mdp, &v, s, a))
                .sum()
        });

        let delta = max_delta(&v, &next);
        v = next;
        if theta > 0. && delta < theta {
            break;
        }
    }

    v
}
