//! JSON run configuration and its dispatch onto the solvers.

use crate::algos::model_based::mdp::{
    common::iterative_policy_evaluation,
    pi::{PolicyEvaluation, PolicyIteration},
    qvi::QValueIteration,
    solver_policy,
    vi::ValueIteration,
    Mdp, MdpSolver,
};
use crate::algos::model_free::gradient_free::{
    off_policy::one_step::off_policy_one_step,
    on_policy::{monte_carlo::*, td::*},
};
use crate::algos::model_free::Control;
use crate::environments::grid_adapter::GridAdapter;
use crate::error::*;
use crate::policy::{greedy_actions, Policy, ScoreSummary};
use gridworld::{Continous, GridEnvironment, World, WorldDesc};
use itertools::Itertools;
use ndarray::{Array1, Array2};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path};
use tracing::info;

fn default_gamma() -> Continous {
    1.
}

fn default_alpha() -> Continous {
    0.5
}

fn default_lambda() -> Continous {
    0.5
}

fn default_episodes() -> usize {
    10_000
}

fn default_sweeps() -> Option<usize> {
    Some(50)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DpParams {
    #[serde(default = "default_gamma")]
    pub gamma: Continous,
    /// Sweep budget; `None` iterates until `theta` is met.
    #[serde(default = "default_sweeps")]
    pub sweeps: Option<usize>,
    #[serde(default)]
    pub theta: Continous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McParams {
    #[serde(default = "default_gamma")]
    pub gamma: Continous,
    #[serde(default = "default_episodes")]
    pub episodes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaParams {
    #[serde(default = "default_gamma")]
    pub gamma: Continous,
    #[serde(default = "default_alpha")]
    pub alpha: Continous,
    #[serde(default = "default_episodes")]
    pub episodes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaParams {
    #[serde(default = "default_gamma")]
    pub gamma: Continous,
    #[serde(default = "default_alpha")]
    pub alpha: Continous,
    #[serde(default = "default_lambda")]
    pub lambda: Continous,
    #[serde(default = "default_episodes")]
    pub episodes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyIterationParams {
    #[serde(default = "default_gamma")]
    pub gamma: Continous,
    #[serde(default)]
    pub evaluation: PolicyEvaluation,
    #[serde(default)]
    pub theta: Continous,
    #[serde(default)]
    pub max_rounds: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Algorithm {
    PolicyValueSystem(DpParams),
    IterativePolicyEvaluation(DpParams),
    FirstVisitMc(McParams),
    EveryVisitMc(McParams),
    IncrementalMc(AlphaParams),
    Td0(AlphaParams),
    PolicyIteration(PolicyIterationParams),
    GlieMc(McParams),
    Sarsa0(AlphaParams),
    SarsaLambda(LambdaParams),
    Qlearn0(AlphaParams),
    ValueIteration(DpParams),
    QvalueIteration(DpParams),
}

/// Policy evaluated by the evaluation algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicySource {
    Uniform,
    #[default]
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub world: WorldDesc,
    pub algorithm: Algorithm,
    #[serde(default)]
    pub policy: PolicySource,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub max_episode_steps: Option<usize>,
    /// Number of games to play with the resulting policy.
    #[serde(default)]
    pub play: Option<usize>,
}

/// What a run produced. `policy` is the evaluated policy for evaluation
/// algorithms and the learnt one otherwise.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub width: usize,
    pub policy: Policy,
    pub values: Option<Array1<Continous>>,
    pub q: Option<Array2<Continous>>,
    pub scores: Option<ScoreSummary>,
}

impl Outcome {
    fn new(width: usize, policy: Policy) -> Self {
        Self {
            width,
            policy,
            values: None,
            q: None,
            scores: None,
        }
    }

    fn with_values(mut self, values: Array1<Continous>) -> Self {
        self.values = Some(values);
        self
    }

    fn with_q(mut self, q: Array2<Continous>) -> Self {
        self.q = Some(q);
        self
    }

    fn control(width: usize, control: Control) -> Self {
        Self::new(width, control.policy).with_q(control.q)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = &self.values {
            writeln!(f, "values:")?;
            for row in &v.iter().chunks(self.width) {
                writeln!(f, "{}", row.map(|x| format!("{x:.2}")).join(" "))?;
            }
        }

        if let Some(q) = &self.q {
            writeln!(f, "q-values:")?;
            for (s, row) in q.outer_iter().enumerate() {
                writeln!(f, "{s}: {}", row.iter().map(|x| format!("{x:.2}")).join(" "))?;
            }
        }

        writeln!(f, "policy:")?;
        write!(f, "{}", self.policy)?;

        if let Some(scores) = &self.scores {
            write!(f, "\nscores:\n{scores}")?;
        }

        Ok(())
    }
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json(&json)
    }

    fn evaluated_policy(&self, n_s: usize, rng: &mut StdRng) -> Policy {
        match self.policy {
            PolicySource::Uniform => Policy::uniform(n_s),
            PolicySource::Random => Policy::random(n_s, rng),
        }
    }

    pub fn run(&self) -> Result<Outcome> {
        let world = World::new(&self.world)?;
        let (n_s, width) = (world.n_s(), world.width());
        let rng = &mut StdRng::seed_from_u64(self.seed);
        let mut env = GridEnvironment::new(world.clone(), self.seed);
        if let Some(n) = self.max_episode_steps {
            env = env.with_max_episode_steps(n);
        }

        info!(algorithm = ?self.algorithm, seed = self.seed, "run started");
        let mut outcome = match &self.algorithm {
            Algorithm::PolicyValueSystem(p) => {
                let pi = self.evaluated_policy(n_s, rng);
                let v = GridAdapter::new(&world, p.gamma).policy_value_system(&pi)?;
                Outcome::new(width, pi).with_values(v)
            }
            Algorithm::IterativePolicyEvaluation(p) => {
                let pi = self.evaluated_policy(n_s, rng);
                let sweeps = p.sweeps.ok_or_else(|| {
                    Error::Config("iterative policy evaluation needs a sweep count".into())
                })?;
                let mdp = GridAdapter::new(&world, p.gamma);
                let v = iterative_policy_evaluation(&mdp, &pi, sweeps, None);
                Outcome::new(width, pi).with_values(v)
            }
            Algorithm::FirstVisitMc(p) => {
                let pi = self.evaluated_policy(n_s, rng);
                let v = mc_first_visit(&mut env, &pi, p.gamma, p.episodes, rng)?;
                Outcome::new(width, pi).with_values(v)
            }
            Algorithm::EveryVisitMc(p) => {
                let pi = self.evaluated_policy(n_s, rng);
                let v = mc_every_visit(&mut env, &pi, p.gamma, p.episodes, rng)?;
                Outcome::new(width, pi).with_values(v)
            }
            Algorithm::IncrementalMc(p) => {
                let pi = self.evaluated_policy(n_s, rng);
                let v = mc_incremental(&mut env, &pi, p.gamma, p.alpha, p.episodes, rng)?;
                Outcome::new(width, pi).with_values(v)
            }
            Algorithm::Td0(p) => {
                let pi = self.evaluated_policy(n_s, rng);
                let v = td0(&mut env, &pi, p.gamma, p.alpha, p.episodes, rng)?;
                Outcome::new(width, pi).with_values(v)
            }
            Algorithm::PolicyIteration(p) => {
                let mdp = GridAdapter::new(&world, p.gamma);
                let solver = &mut PolicyIteration::new(&mdp, p.evaluation);
                let (stable, rounds) = solver.exec(p.theta, p.max_rounds)?;
                info!(stable, rounds, "policy iteration finished");
                Outcome::new(width, solver.policy().clone()).with_values(solver.values().clone())
            }
            Algorithm::GlieMc(p) => {
                let control = glie_control(&mut env, n_s, p.gamma, p.episodes, None, rng)?;
                Outcome::control(width, control)
            }
            Algorithm::Sarsa0(p) => {
                let control = sarsa(&mut env, p.gamma, p.alpha, p.episodes, rng)?;
                Outcome::control(width, control)
            }
            Algorithm::SarsaLambda(p) => {
                let control =
                    sarsa_lambda(&mut env, p.gamma, p.alpha, p.lambda, p.episodes, rng)?;
                Outcome::control(width, control)
            }
            Algorithm::Qlearn0(p) => {
                let control = off_policy_one_step(&mut env, p.gamma, p.alpha, p.episodes, rng)?;
                Outcome::control(width, control)
            }
            Algorithm::ValueIteration(p) => {
                let mdp = GridAdapter::new(&world, p.gamma);
                let solver = &mut ValueIteration::new(&mdp);
                let (converged, sweeps) = solver.exec(p.theta, p.sweeps)?;
                info!(converged, sweeps, "value iteration finished");
                Outcome::new(width, solver_policy::<bool>(&*solver, mdp.n_s()))
                    .with_values(solver.values().clone())
            }
            Algorithm::QvalueIteration(p) => {
                let mdp = GridAdapter::new(&world, p.gamma);
                let solver = &mut QValueIteration::new(&mdp);
                let (converged, sweeps) = solver.exec(p.theta, p.sweeps)?;
                info!(converged, sweeps, "q-value iteration finished");
                let q = solver.q_values().clone();
                Outcome::new(width, Policy::deterministic(&greedy_actions(&q))).with_q(q)
            }
        };

        if let Some(n) = self.play {
            let scores = outcome.policy.play_games(&mut env, n, rng)?;
            info!(min = scores.min, mean = scores.mean, max = scores.max, "games played");
            outcome.scores = Some(scores);
        }

        Ok(outcome)
    }
}
