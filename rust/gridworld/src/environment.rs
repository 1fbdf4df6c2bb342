use crate::common::defs::*;
use crate::hazard::{Hazard, HazardMode};
use crate::world::{ItemKind, World};
use rand::prelude::*;
use tracing::debug;

pub const MAGIC_DURATION: usize = 25;
pub const REWARD_KILL: Continous = 250.;
pub const REWARD_KILLED: Continous = -500.;

pub type ItemId = usize;
pub type AgentId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub pos: Discrete,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentKind {
    Player,
    Hazard(Hazard),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub pos: Discrete,
    pub kind: AgentKind,
}

/// Stepping simulation of a grid world.
///
/// Items and agents live in arenas indexed by [`ItemId`] / [`AgentId`].
/// Consumed items and removed hazards leave an empty slot until the next reset.
#[derive(Debug, Clone)]
pub struct GridEnvironment {
    world: World,
    items: Vec<Option<Item>>,
    agents: Vec<Option<Agent>>,
    player: AgentId,
    score: Continous,
    finished: bool,
    immunity: usize,
    steps: usize,
    max_episode_steps: Option<usize>,
    rng: StdRng,
}

impl GridEnvironment {
    pub fn new(world: World, seed: u64) -> Self {
        let mut env = Self {
            world,
            items: vec![],
            agents: vec![],
            player: 0,
            score: 0.,
            finished: false,
            immunity: 0,
            steps: 0,
            max_episode_steps: None,
            rng: StdRng::seed_from_u64(seed),
        };
        env.reset();

        env
    }

    /// Episodes reaching `n` steps without terminating are flagged as truncated.
    pub fn with_max_episode_steps(mut self, n: usize) -> Self {
        self.max_episode_steps = Some(n);
        self
    }

    pub fn max_episode_steps(&self) -> Option<usize> {
        self.max_episode_steps
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn state(&self) -> Discrete {
        self.agent(self.player).pos
    }

    pub fn score(&self) -> Continous {
        self.score
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn immunity(&self) -> usize {
        self.immunity
    }

    pub fn items_left(&self) -> usize {
        self.items.iter().flatten().count()
    }

    /// Positions and modes of the hazards still in play.
    pub fn hazards(&self) -> Vec<(Discrete, HazardMode)> {
        self.agents
            .iter()
            .flatten()
            .filter_map(|a| match &a.kind {
                AgentKind::Hazard(h) => Some((a.pos, h.mode())),
                AgentKind::Player => None,
            })
            .collect()
    }

    pub fn reset(&mut self) -> Discrete {
        self.items = self
            .world
            .items()
            .iter()
            .map(|&(pos, kind)| Some(Item { pos, kind }))
            .collect();

        self.agents = self
            .world
            .hazards()
            .iter()
            .map(|&(pos, kind)| {
                Some(Agent {
                    pos,
                    kind: AgentKind::Hazard(Hazard::new(kind)),
                })
            })
            .collect();
        self.player = self.agents.len();
        self.agents.push(Some(Agent {
            pos: self.world.start(),
            kind: AgentKind::Player,
        }));

        self.score = 0.;
        self.finished = false;
        self.immunity = 0;
        self.steps = 0;

        self.world.start()
    }

    pub fn step(&mut self, action: Action) -> StepInfo {
        assert!(!self.finished, "step called on a finished episode");

        self.immunity = self.immunity.saturating_sub(1);
        for id in 0..self.agents.len() {
            self.take_turn(id);
        }

        let action = self.perturb(action);
        let pos = self.world.next_cell(self.state(), action);
        if let Some(player) = self.agents[self.player].as_mut() {
            player.pos = pos;
        }

        let reward = self.collect(pos);
        self.score += reward;
        self.steps += 1;

        let truncated = !self.finished && self.max_episode_steps.is_some_and(|m| self.steps >= m);
        if self.finished {
            debug!(steps = self.steps, score = self.score, "episode finished");
        }

        StepInfo {
            observation: pos,
            reward,
            terminated: self.finished,
            truncated,
        }
    }

    fn agent(&self, id: AgentId) -> &Agent {
        self.agents[id]
            .as_ref()
            .expect("the player is never removed")
    }

    /// Single dispatch point for everything that moves on its own.
    fn take_turn(&mut self, id: AgentId) {
        let player = self.state();
        let frightened = self.immunity > 0;
        match self.agents[id].as_mut() {
            Some(Agent {
                pos,
                kind: AgentKind::Hazard(h),
            }) => *pos = h.advance(&self.world, *pos, player, frightened, &mut self.rng),
            Some(Agent {
                kind: AgentKind::Player,
                ..
            })
            | None => {}
        }
    }

    fn perturb(&mut self, action: Action) -> Action {
        if self.rng.gen::<Continous>() >= self.world.proba_action_valid() {
            Action::ALL[self.rng.gen_range(0..N_ACTIONS)]
        } else {
            action
        }
    }

    /// Reward for the player landing on `pos`: terrain, items, hazard contact.
    fn collect(&mut self, pos: Discrete) -> Continous {
        let terrain = self.world.terrain(pos);
        let mut reward = terrain.reward();
        let mut finished = terrain.is_terminal();

        for slot in self.items.iter_mut() {
            if slot.as_ref().is_some_and(|it| it.pos == pos) {
                if let Some(item) = slot.take() {
                    reward += item.kind.reward();
                    if item.kind == ItemKind::Magic {
                        self.immunity = MAGIC_DURATION;
                    }
                }
            }
        }

        for (id, slot) in self.agents.iter_mut().enumerate() {
            let hit = matches!(
                slot,
                Some(Agent { pos: p, kind: AgentKind::Hazard(_) }) if *p == pos
            );
            if !hit {
                continue;
            }

            if self.immunity == 0 {
                debug!(hazard = id, pos, "player caught");
                reward += REWARD_KILLED;
                finished = true;
            } else {
                debug!(hazard = id, pos, "hazard removed");
                reward += REWARD_KILL;
                *slot = None;
            }
        }

        self.finished = finished;
        reward
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::*;

    fn env(rows: &[&str], p: f64) -> GridEnvironment {
        GridEnvironment::new(World::from_rows(p, rows).unwrap(), 2718)
    }

    #[test]
    fn deterministic_walk_to_goal() {
        let e = &mut env(&["S.G"], 1.);

        let si = e.step(Action::Right);
        assert_eq!(si.observation, 1);
        assert_float_eq!(si.reward, -1., abs <= 1e-12);
        assert!(!si.terminated);

        let si = e.step(Action::Right);
        assert_eq!(si.observation, 2);
        assert_float_eq!(si.reward, 1000., abs <= 1e-12);
        assert!(si.terminated);
        assert!(e.is_finished());
        assert_float_eq!(e.score(), 999., abs <= 1e-12);

        assert_eq!(e.reset(), 0);
        assert_eq!(e.state(), 0);
        assert!(!e.is_finished());
        assert_float_eq!(e.score(), 0., abs <= 1e-12);
    }

    #[test]
    fn hole_ends_episode() {
        let e = &mut env(&["SH", ".G"], 1.);
        let si = e.step(Action::Right);

        assert!(si.terminated);
        assert_float_eq!(si.reward, -1000., abs <= 1e-12);
    }

    #[test]
    fn items_are_single_use_per_episode() {
        let e = &mut env(&["SCG", "..."], 1.);

        assert_float_eq!(e.step(Action::Right).reward, 9., abs <= 1e-12);
        assert_eq!(e.items_left(), 0);
        assert_float_eq!(e.step(Action::Left).reward, -1., abs <= 1e-12);
        assert_float_eq!(e.step(Action::Right).reward, -1., abs <= 1e-12);

        e.reset();
        assert_eq!(e.items_left(), 1);
    }

    #[test]
    fn hazard_contact_is_fatal() {
        // The hazard walks into the corridor towards its corner while the
        // player walks into it.
        let e = &mut env(&["S.3", "WWG"], 1.);
        let si = e.step(Action::Right);

        assert!(si.terminated);
        assert_float_eq!(si.reward, -1. + REWARD_KILLED, abs <= 1e-12);
    }

    #[test]
    fn immune_player_removes_hazard() {
        let e = &mut env(&["SM.3", "WWWG"], 1.);

        let si = e.step(Action::Right);
        assert_eq!(e.immunity(), MAGIC_DURATION);
        assert!(!si.terminated);
        assert_eq!(e.hazards(), vec![(2, HazardMode::Scatter)]);

        // Wait against the top edge; the frightened hazard can only come closer.
        let si = e.step(Action::Up);
        assert_eq!(si.observation, 1);
        assert!(!si.terminated);
        assert_float_eq!(si.reward, -1. + REWARD_KILL, abs <= 1e-12);
        assert!(e.hazards().is_empty());
    }

    #[test]
    fn truncates_at_step_cap() {
        let mut e = env(&["S.", "WG"], 1.).with_max_episode_steps(3);

        assert!(!e.step(Action::Up).truncated);
        assert!(!e.step(Action::Up).truncated);
        let si = e.step(Action::Up);
        assert!(si.truncated);
        assert!(!si.terminated);
    }

    #[test]
    fn same_seed_same_trajectory() {
        let run = || {
            let e = &mut env(&["S...", ".H..", "...G"], 0.5);
            let mut states = vec![];
            while !e.is_finished() && states.len() < 200 {
                states.push(e.step(Action::Right).observation);
            }
            states
        };

        assert_eq!(run(), run());
    }
}
