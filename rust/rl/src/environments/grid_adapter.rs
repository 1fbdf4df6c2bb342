use crate::algos::model_based::mdp::Mdp;
use gridworld::{Action, Continous, Discrete, World, N_ACTIONS};
use itertools::iproduct;
use ndarray::{s, Array1, Array2, Array3};

/// Explicit transition model of a [`World`].
///
/// Items and hazards are not part of the model, only terrain.
pub struct GridAdapter {
    gamma: Continous,
    p: Array3<Continous>,
    r: Array2<Continous>,
    absorbing: Vec<bool>,
}

impl GridAdapter {
    pub fn new(world: &World, gamma: Continous) -> Self {
        let n_s = world.n_s();
        let absorbing: Vec<_> = (0..n_s).map(|s| world.terrain(s).is_absorbing()).collect();

        let mut p = Array3::zeros((N_ACTIONS, n_s, n_s));
        for (a, s) in iproduct!(Action::ALL, 0..n_s) {
            if absorbing[s] {
                continue;
            }
            for (s2, prob) in world.next_states(s, a) {
                p[[a.index(), s, s2]] += prob;
            }
        }

        let landing = Array1::from_shape_fn(n_s, |s| world.reward(s));
        let r = Array2::from_shape_fn((N_ACTIONS, n_s), |(a, s)| {
            p.slice(s![a, s, ..]).dot(&landing)
        });

        Self {
            gamma,
            p,
            r,
            absorbing,
        }
    }
}

impl Mdp for GridAdapter {
    fn n_s(&self) -> usize {
        self.absorbing.len()
    }

    fn n_a(&self) -> usize {
        N_ACTIONS
    }

    fn gamma(&self) -> Continous {
        self.gamma
    }

    fn p(&self) -> &Array3<Continous> {
        &self.p
    }

    fn r(&self) -> &Array2<Continous> {
        &self.r
    }

    fn is_absorbing(&self, s: Discrete) -> bool {
        self.absorbing[s]
    }
}
