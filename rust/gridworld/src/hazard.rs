//! Non-learning hazards that roam the grid.
//!
//! A hazard is always in one of three modes:
//! - scatter: head for its own corner of the map,
//! - chase: head for the player,
//! - frightened: wander randomly while the player is immune.
//!
//! Every hazard opens with a long scatter phase, then alternates between chase
//! and scatter with its shorter per-kind timer. The bottom-left hazard never
//! leaves its opening phase. The timer is paused while frightened and the
//! interrupted mode resumes afterwards. On every switch between scatter and
//! chase the hazard reverses its previous move, or moves left if it has not
//! moved yet.

use crate::common::{defs::*, utils::*};
use crate::world::{HazardKind, World};
use rand::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardMode {
    Scatter,
    Chase,
    Frightened,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hazard {
    kind: HazardKind,
    mode: HazardMode,
    resume: HazardMode,
    timer: Option<u32>,
    last_move: Option<Action>,
}

impl Hazard {
    pub fn new(kind: HazardKind) -> Self {
        Self {
            kind,
            mode: HazardMode::Scatter,
            resume: HazardMode::Scatter,
            timer: kind.first_phase_steps(),
            last_move: None,
        }
    }

    pub fn kind(&self) -> HazardKind {
        self.kind
    }

    pub fn mode(&self) -> HazardMode {
        self.mode
    }

    pub fn scatter_target(&self, world: &World) -> Discrete {
        let (w, h) = (world.width(), world.height());
        match self.kind {
            HazardKind::TopRight => world.state(w - 1, 0),
            HazardKind::TopLeft => world.state(0, 0),
            HazardKind::BottomRight => world.state(w - 1, h - 1),
            HazardKind::BottomLeft => world.state(0, h - 1),
        }
    }

    /// Moves that change position, excluding the reverse of the last move
    /// unless nothing else is possible.
    pub fn possible_moves(&self, world: &World, pos: Discrete) -> Vec<Action> {
        let moving = |a: &Action| world.next_cell(pos, *a) != pos;
        let reverse = self.last_move.map(Action::reverse);

        let moves: Vec<_> = Action::ALL
            .into_iter()
            .filter(|a| Some(*a) != reverse)
            .filter(moving)
            .collect();

        match reverse {
            Some(r) if moves.is_empty() && moving(&r) => vec![r],
            _ => moves,
        }
    }

    /// Plays one turn and returns the new position.
    pub fn advance(
        &mut self,
        world: &World,
        pos: Discrete,
        player: Discrete,
        frightened: bool,
        rng: &mut StdRng,
    ) -> Discrete {
        if frightened {
            if self.mode != HazardMode::Frightened {
                self.resume = self.mode;
                self.mode = HazardMode::Frightened;
            }

            let moves = self.possible_moves(world, pos);
            return match moves.choose(rng) {
                Some(&a) => self.make_move(world, pos, a),
                None => pos,
            };
        }

        if self.mode == HazardMode::Frightened {
            self.mode = self.resume;
        }

        let target = match self.mode {
            HazardMode::Chase => player,
            _ => self.scatter_target(world),
        };

        let chosen = if self.timer == Some(0) {
            self.switch_mode();
            Some(self.last_move.map_or(Action::Left, Action::reverse))
        } else {
            self.timer = self.timer.map(|t| t - 1);
            self.closest_move(world, pos, target)
        };

        match chosen {
            Some(a) => self.make_move(world, pos, a),
            None => pos,
        }
    }

    fn closest_move(&self, world: &World, pos: Discrete, target: Discrete) -> Option<Action> {
        let target = world.coords(target);
        let mut best: Option<(Action, usize)> = None;
        for a in self.possible_moves(world, pos) {
            let d = manhattan_dist(world.coords(world.next_cell(pos, a)), target);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((a, d));
            }
        }

        best.map(|(a, _)| a)
    }

    fn switch_mode(&mut self) {
        self.mode = match self.mode {
            HazardMode::Scatter => HazardMode::Chase,
            _ => HazardMode::Scatter,
        };
        self.timer = Some(self.kind.scatter_steps());
    }

    fn make_move(&mut self, world: &World, pos: Discrete, a: Action) -> Discrete {
        self.last_move = Some(a);
        world.next_cell(pos, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertor::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(2718)
    }

    #[test]
    fn scatter_targets_are_corners() {
        let w = World::from_rows(1., &["S..", "...", "..G"]).unwrap();
        let corner = |k| Hazard::new(k).scatter_target(&w);

        assert_eq!(corner(HazardKind::TopRight), 2);
        assert_eq!(corner(HazardKind::TopLeft), 0);
        assert_eq!(corner(HazardKind::BottomRight), 8);
        assert_eq!(corner(HazardKind::BottomLeft), 6);
    }

    #[test]
    fn never_reverses_unless_cornered() {
        let w = World::from_rows(1., &["S...G"]).unwrap();
        let mut h = Hazard::new(HazardKind::TopLeft);
        h.last_move = Some(Action::Right);

        assert_eq!(h.possible_moves(&w, 2), vec![Action::Right]);
        // Dead end on the right edge: reversing is the only option.
        assert_eq!(h.possible_moves(&w, 4), vec![Action::Left]);
    }

    #[test]
    fn boxed_in_hazard_stays_put() {
        let w = World::from_rows(1., &["SWG", "W.W", "GWG"]).unwrap();
        let mut h = Hazard::new(HazardKind::TopLeft);

        assert!(h.possible_moves(&w, 4).is_empty());
        assert_eq!(h.advance(&w, 4, 0, false, &mut rng()), 4);
    }

    #[test]
    fn scatter_heads_for_corner() {
        let w = World::from_rows(1., &["S....", ".....", "....G"]).unwrap();
        let mut h = Hazard::new(HazardKind::TopLeft);
        let rng = &mut rng();

        let mut pos = w.state(4, 2);
        for _ in 0..6 {
            pos = h.advance(&w, pos, 0, false, rng);
        }

        assert_eq!(pos, 0);
        assert_eq!(h.mode(), HazardMode::Scatter);
    }

    #[test]
    fn opening_scatter_then_short_phases() {
        let w = World::from_rows(1., &["S....", ".....", "....G"]).unwrap();
        let mut h = Hazard::new(HazardKind::TopRight);
        let rng = &mut rng();
        let mut pos = w.state(0, 2);

        for _ in 0..60 {
            pos = h.advance(&w, pos, 0, false, rng);
        }
        assert_that!(h.mode()).is_equal_to(HazardMode::Scatter);

        pos = h.advance(&w, pos, 0, false, rng);
        assert_that!(h.mode()).is_equal_to(HazardMode::Chase);
        for _ in 0..HazardKind::TopRight.scatter_steps() {
            pos = h.advance(&w, pos, 0, false, rng);
        }
        assert_that!(h.mode()).is_equal_to(HazardMode::Chase);

        h.advance(&w, pos, 0, false, rng);
        assert_that!(h.mode()).is_equal_to(HazardMode::Scatter);
        assert_that!(h.timer).is_equal_to(Some(HazardKind::TopRight.scatter_steps()));
    }

    #[test]
    fn bottom_left_never_chases() {
        let w = World::from_rows(1., &["S....", ".....", "....G"]).unwrap();
        let mut h = Hazard::new(HazardKind::BottomLeft);
        let rng = &mut rng();

        let mut pos = w.state(4, 0);
        for _ in 0..200 {
            pos = h.advance(&w, pos, 4, false, rng);
            assert_that!(h.mode()).is_equal_to(HazardMode::Scatter);
        }
        assert_that!(h.timer).is_none();
    }

    #[test]
    fn expiry_without_previous_move_goes_left() {
        let w = World::from_rows(1., &["S....", ".....", "....G"]).unwrap();
        let mut h = Hazard::new(HazardKind::TopLeft);
        h.timer = Some(0);

        let pos = h.advance(&w, w.state(2, 1), 0, false, &mut rng());

        assert_that!(pos).is_equal_to(w.state(1, 1));
        assert_that!(h.mode()).is_equal_to(HazardMode::Chase);
    }

    #[test]
    fn chase_reaches_player() {
        let w = World::from_rows(1., &["S....", ".....", "....G"]).unwrap();
        let mut h = Hazard {
            kind: HazardKind::TopLeft,
            mode: HazardMode::Chase,
            resume: HazardMode::Chase,
            timer: Some(HazardKind::TopLeft.scatter_steps()),
            last_move: None,
        };
        let rng = &mut rng();
        let player = w.state(4, 0);

        let mut pos = w.state(0, 2);
        for _ in 0..6 {
            pos = h.advance(&w, pos, player, false, rng);
        }

        assert_that!(pos).is_equal_to(player);
        assert_that!(h.mode()).is_equal_to(HazardMode::Chase);
    }

    #[test]
    fn frightened_pauses_and_resumes() {
        let w = World::from_rows(1., &["S....", ".....", "....G"]).unwrap();
        let mut h = Hazard::new(HazardKind::TopRight);
        let rng = &mut rng();

        let pos = h.advance(&w, 7, 0, false, rng);
        let timer = h.timer;
        let pos = h.advance(&w, pos, 0, true, rng);
        assert_eq!(h.mode(), HazardMode::Frightened);
        assert_eq!(h.timer, timer);

        h.advance(&w, pos, 0, false, rng);
        assert_eq!(h.mode(), HazardMode::Scatter);
    }
}
