use crate::common::{defs::*, utils::*};
use crate::error::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terrain {
    Ground,
    Goal,
    Wall,
    Hole,
}

impl Terrain {
    pub fn reward(self) -> Continous {
        match self {
            Terrain::Ground => -1.,
            Terrain::Goal => 1000.,
            Terrain::Hole => -1000.,
            Terrain::Wall => 0.,
        }
    }

    /// Entering the cell ends the episode.
    pub fn is_terminal(self) -> bool {
        matches!(self, Terrain::Goal | Terrain::Hole)
    }

    pub fn is_reachable(self) -> bool {
        self != Terrain::Wall
    }

    /// No forward transitions out of the cell in the explicit model.
    pub fn is_absorbing(self) -> bool {
        self != Terrain::Ground
    }

    fn code(self) -> char {
        match self {
            Terrain::Ground => '.',
            Terrain::Goal => 'G',
            Terrain::Wall => 'W',
            Terrain::Hole => 'H',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Apple,
    Cake,
    Pizza,
    /// Grants temporary immunity against hazards.
    Magic,
}

impl ItemKind {
    pub fn reward(self) -> Continous {
        match self {
            ItemKind::Apple => 1.,
            ItemKind::Cake => 10.,
            ItemKind::Pizza => 25.,
            ItemKind::Magic => 0.,
        }
    }
}

/// Hazards are named after the corner they retreat to in scatter mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardKind {
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
}

impl HazardKind {
    pub fn scatter_steps(self) -> u32 {
        match self {
            HazardKind::TopRight | HazardKind::TopLeft => 21,
            HazardKind::BottomRight | HazardKind::BottomLeft => 15,
        }
    }

    /// Length of the opening scatter phase. `None` means the hazard never
    /// leaves scatter mode.
    pub fn first_phase_steps(self) -> Option<u32> {
        match self {
            HazardKind::BottomLeft => None,
            _ => Some(60),
        }
    }
}

/// A single character of a world map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellCode {
    Start,
    Terrain(Terrain),
    Item(ItemKind),
    Hazard(HazardKind),
}

impl CellCode {
    pub fn from_char(c: char) -> Option<Self> {
        let code = match c {
            'S' => CellCode::Start,
            'G' => CellCode::Terrain(Terrain::Goal),
            'W' => CellCode::Terrain(Terrain::Wall),
            'H' => CellCode::Terrain(Terrain::Hole),
            '.' => CellCode::Terrain(Terrain::Ground),
            'A' => CellCode::Item(ItemKind::Apple),
            'C' => CellCode::Item(ItemKind::Cake),
            'P' => CellCode::Item(ItemKind::Pizza),
            'M' => CellCode::Item(ItemKind::Magic),
            '2' => CellCode::Hazard(HazardKind::TopRight),
            '3' => CellCode::Hazard(HazardKind::TopLeft),
            '4' => CellCode::Hazard(HazardKind::BottomRight),
            '5' => CellCode::Hazard(HazardKind::BottomLeft),
            _ => return None,
        };

        Some(code)
    }

    /// Items, hazards and the start all sit on ground.
    pub fn terrain(self) -> Terrain {
        match self {
            CellCode::Terrain(t) => t,
            _ => Terrain::Ground,
        }
    }
}

/// Resolved world description as handed over by a loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldDesc {
    pub width: usize,
    pub height: usize,
    pub proba_action_valid: Continous,
    pub map: Vec<String>,
}

/// Static layout of a grid world. Never changes during an episode.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    width: usize,
    height: usize,
    proba_action_valid: Continous,
    cells: Vec<Terrain>,
    start: Discrete,
    items: Vec<(Discrete, ItemKind)>,
    hazards: Vec<(Discrete, HazardKind)>,
}

impl World {
    pub fn new(desc: &WorldDesc) -> Result<Self> {
        let WorldDesc {
            width,
            height,
            proba_action_valid,
            map,
        } = desc;
        let (width, height) = (*width, *height);

        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }

        if !(0. ..=1.).contains(proba_action_valid) {
            return Err(Error::InvalidProbability(*proba_action_valid));
        }

        if map.len() != height {
            return Err(Error::RowCount {
                expected: height,
                got: map.len(),
            });
        }

        let mut cells = Vec::with_capacity(width * height);
        let mut start = None;
        let mut items = vec![];
        let mut hazards = vec![];
        for (y, row) in map.iter().enumerate() {
            let got = row.chars().count();
            if got != width {
                return Err(Error::RowWidth {
                    row: y,
                    expected: width,
                    got,
                });
            }

            for (x, c) in row.chars().enumerate() {
                let code =
                    CellCode::from_char(c).ok_or(Error::UnknownCellCode { code: c, x, y })?;
                let s = y * width + x;
                match code {
                    CellCode::Start if start.is_some() => {
                        return Err(Error::DuplicateStart { x, y })
                    }
                    CellCode::Start => start = Some(s),
                    CellCode::Item(kind) => items.push((s, kind)),
                    CellCode::Hazard(kind) => hazards.push((s, kind)),
                    CellCode::Terrain(_) => {}
                }
                cells.push(code.terrain());
            }
        }

        let start = start.ok_or(Error::MissingStart)?;
        if !cells.contains(&Terrain::Goal) {
            return Err(Error::MissingGoal);
        }

        Ok(Self {
            width,
            height,
            proba_action_valid: *proba_action_valid,
            cells,
            start,
            items,
            hazards,
        })
    }

    /// Builds a world from map rows, taking the dimensions from the rows.
    pub fn from_rows(proba_action_valid: Continous, rows: &[&str]) -> Result<Self> {
        Self::new(&WorldDesc {
            width: rows.first().map_or(0, |r| r.chars().count()),
            height: rows.len(),
            proba_action_valid,
            map: rows.iter().map(|r| r.to_string()).collect(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn n_s(&self) -> usize {
        self.cells.len()
    }

    pub fn proba_action_valid(&self) -> Continous {
        self.proba_action_valid
    }

    pub fn start(&self) -> Discrete {
        self.start
    }

    pub fn items(&self) -> &[(Discrete, ItemKind)] {
        &self.items
    }

    pub fn hazards(&self) -> &[(Discrete, HazardKind)] {
        &self.hazards
    }

    pub fn state(&self, x: usize, y: usize) -> Discrete {
        assert!(
            x < self.width && y < self.height,
            "cell ({x}, {y}) is outside a {}x{} world",
            self.width,
            self.height
        );
        y * self.width + x
    }

    pub fn coords(&self, s: Discrete) -> (usize, usize) {
        assert!(s < self.n_s(), "state {s} is outside the world");
        (s % self.width, s / self.width)
    }

    pub fn terrain(&self, s: Discrete) -> Terrain {
        self.cells[s]
    }

    /// Reward for entering `s`, ignoring items and hazards.
    pub fn reward(&self, s: Discrete) -> Continous {
        self.terrain(s).reward()
    }

    /// Deterministic move: clipped to the grid, reverted if it would enter a wall.
    pub fn next_cell(&self, s: Discrete, a: Action) -> Discrete {
        let (x, y) = self.coords(s);
        let (dx, dy) = a.delta();
        let next = self.state(
            clamped_offset(x, dx, self.width),
            clamped_offset(y, dy, self.height),
        );

        if self.terrain(next).is_reachable() {
            next
        } else {
            s
        }
    }

    /// Successor distribution of intending `a` in `s` under the action noise.
    /// Successors reached by several executed actions are merged.
    pub fn next_states(&self, s: Discrete, a: Action) -> Vec<(Discrete, Continous)> {
        let p = self.proba_action_valid;
        let mut next: Vec<(Discrete, Continous)> = Vec::with_capacity(N_ACTIONS);
        for executed in Action::ALL {
            let s2 = self.next_cell(s, executed);
            let mut prob = (1. - p) / N_ACTIONS as Continous;
            if executed == a {
                prob += p;
            }

            match next.iter_mut().find(|(x, _)| *x == s2) {
                Some((_, acc)) => *acc += prob,
                None => next.push((s2, prob)),
            }
        }

        next
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.cells.chunks(self.width).enumerate() {
            if y > 0 {
                writeln!(f)?;
            }
            for (x, t) in row.iter().enumerate() {
                let c = if self.state(x, y) == self.start {
                    'S'
                } else {
                    t.code()
                };
                write!(f, "{c}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::*;
    use rstest::rstest;

    fn desc(width: usize, height: usize, p: f64, map: &[&str]) -> WorldDesc {
        WorldDesc {
            width,
            height,
            proba_action_valid: p,
            map: map.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn parses_layout_items_and_hazards() {
        let w = World::from_rows(0.8, &["S.A2", ".W.G", "M.H5"]).unwrap();

        assert_eq!((w.width(), w.height(), w.n_s()), (4, 3, 12));
        assert_eq!(w.start(), 0);
        assert_eq!(w.terrain(5), Terrain::Wall);
        assert_eq!(w.terrain(7), Terrain::Goal);
        assert_eq!(w.terrain(10), Terrain::Hole);
        assert_eq!(w.terrain(2), Terrain::Ground);
        assert_eq!(w.items(), &[(2, ItemKind::Apple), (8, ItemKind::Magic)]);
        assert_eq!(
            w.hazards(),
            &[(3, HazardKind::TopRight), (11, HazardKind::BottomLeft)]
        );
        assert_eq!(w.to_string(), "S...\n.W.G\n..H.");
    }

    #[rstest]
    #[case(desc(0, 1, 1., &[]), Error::InvalidDimensions { width: 0, height: 1 })]
    #[case(desc(2, 1, 1.5, &["SG"]), Error::InvalidProbability(1.5))]
    #[case(desc(2, 2, 1., &["SG"]), Error::RowCount { expected: 2, got: 1 })]
    #[case(desc(2, 2, 1., &["SG", "..."]), Error::RowWidth { row: 1, expected: 2, got: 3 })]
    #[case(desc(2, 1, 1., &["SX"]), Error::UnknownCellCode { code: 'X', x: 1, y: 0 })]
    #[case(desc(2, 1, 1., &[".G"]), Error::MissingStart)]
    #[case(desc(3, 1, 1., &["SSG"]), Error::DuplicateStart { x: 1, y: 0 })]
    #[case(desc(2, 1, 1., &["S."]), Error::MissingGoal)]
    fn rejects_malformed_worlds(#[case] desc: WorldDesc, #[case] expected: Error) {
        assert_eq!(World::new(&desc), Err(expected));
    }

    #[test]
    fn rejects_nan_probability() {
        let err = World::new(&desc(2, 1, f64::NAN, &["SG"])).unwrap_err();
        assert!(matches!(err, Error::InvalidProbability(_)));
    }

    #[test]
    fn deserializes_description() {
        let json = r#"{"width": 3, "height": 1, "proba_action_valid": 0.9, "map": ["S.G"]}"#;
        let d: WorldDesc = serde_json::from_str(json).unwrap();

        assert_eq!(d, desc(3, 1, 0.9, &["S.G"]));
        assert!(World::new(&d).is_ok());
    }

    #[rstest]
    #[case(4, Action::Up, 1)]
    #[case(4, Action::Down, 7)]
    #[case(4, Action::Left, 3)]
    #[case(4, Action::Right, 4)]
    #[case(0, Action::Up, 0)]
    #[case(0, Action::Left, 0)]
    #[case(8, Action::Down, 8)]
    #[case(8, Action::Right, 8)]
    fn next_cell_clips_and_vetoes_walls(
        #[case] s: Discrete,
        #[case] a: Action,
        #[case] expected: Discrete,
    ) {
        let w = World::from_rows(1., &["S..", "..W", "..G"]).unwrap();
        assert_eq!(w.next_cell(s, a), expected);
    }

    #[test]
    fn next_states_follow_noise_model() {
        let w = World::from_rows(0.6, &["S.", ".G"]).unwrap();

        let next = w.next_states(0, Action::Right);
        // Up and Left both bounce back to the start.
        assert_eq!(next.len(), 3);
        let p = |s: Discrete| next.iter().find(|(x, _)| *x == s).unwrap().1;
        assert_float_eq!(p(1), 0.6 + 0.1, abs <= 1e-12);
        assert_float_eq!(p(0), 0.2, abs <= 1e-12);
        assert_float_eq!(p(2), 0.1, abs <= 1e-12);
    }

    #[test]
    fn next_states_sum_to_one_everywhere() {
        let w = World::from_rows(0.3, &["S.W.", ".H..", "W..G"]).unwrap();
        for s in 0..w.n_s() {
            for a in Action::ALL {
                let total: f64 = w.next_states(s, a).iter().map(|(_, p)| p).sum();
                assert_float_eq!(total, 1., abs <= 1e-12);
            }
        }
    }

    #[test]
    #[should_panic]
    fn out_of_range_coordinates_fail_fast() {
        let w = World::from_rows(1., &["SG"]).unwrap();
        w.state(2, 0);
    }
}
