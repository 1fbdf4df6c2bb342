use crate::algos::model_based::mdp::Mdp;
use gridworld::{Action, Continous, Discrete, N_ACTIONS};
use ndarray::{s, Array1, Array2, Array3};

/// https://towardsdatascience.com/reinforcement-learning-an-easy-introduction-to-value-iteration-e4cfe0731fd5
///
/// Tee (0), fairway (1), hole (2). `Up` drives from the tee, `Down` putts
/// from the fairway, everything else stays put. Sinking the ball pays 10.
pub struct SimpleGolf {
    gamma: Continous,
    p: Array3<Continous>,
    r: Array2<Continous>,
}

impl SimpleGolf {
    pub const HOLE: Discrete = 2;

    pub fn new(gamma: Continous) -> Self {
        let n_s = 3;
        let mut p = Array3::zeros((N_ACTIONS, n_s, n_s));
        for a in Action::ALL {
            for s in 0..Self::HOLE {
                p[[a.index(), s, s]] = 1.;
            }
        }
        for (a, s) in [(Action::Up, 0), (Action::Down, 1)] {
            p[[a.index(), s, s]] = 0.1;
            p[[a.index(), s, s + 1]] = 0.9;
        }

        let landing = Array1::from_vec(vec![0., 0., 10.]);
        let r = Array2::from_shape_fn((N_ACTIONS, n_s), |(a, s)| {
            p.slice(s![a, s, ..]).dot(&landing)
        });

        Self { gamma, p, r }
    }
}

impl Mdp for SimpleGolf {
    fn n_s(&self) -> usize {
        self.p.dim().1
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
        s == Self::HOLE
    }
}
