use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::num::Saturating;
use core::ops::{BitOr, BitOrAssign};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

/// Cells opened by a reveal or chord, in the order they were opened.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealResult {
    pub revealed: Vec<Coord2>,
    pub hit_mine: bool,
    pub exploded_cell: Option<Coord2>,
    pub powerup: Option<PowerupKind>,
}

impl RevealResult {
    pub fn has_update(&self) -> bool {
        !self.revealed.is_empty()
    }
}

/// Used to merge results when multi-revealing, the first mine and power-up win
impl BitOr for RevealResult {
    type Output = RevealResult;

    fn bitor(mut self, rhs: Self) -> Self::Output {
        self |= rhs;
        self
    }
}

impl BitOrAssign for RevealResult {
    fn bitor_assign(&mut self, rhs: Self) {
        self.revealed.extend(rhs.revealed);
        self.hit_mine |= rhs.hit_mine;
        self.exploded_cell = self.exploded_cell.or(rhs.exploded_cell);
        self.powerup = self.powerup.or(rhs.powerup);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagResult {
    pub changed: bool,
    pub cell: Option<Cell>,
}

impl FlagResult {
    pub const NO_CHANGE: Self = Self {
        changed: false,
        cell: None,
    };

    pub const fn has_update(&self) -> bool {
        self.changed
    }
}

/// The minefield grid. Mines are placed lazily, on the first reveal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    cells: Array2<Cell>,
    mine_count: CellCount,
    flagged_count: Saturating<CellCount>,
    mines_placed: bool,
    powerup_config: PowerupConfig,
}

impl Board {
    pub fn new(
        rows: Coord,
        cols: Coord,
        mine_count: CellCount,
        powerup_config: PowerupConfig,
    ) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(GameError::InvalidDimensions);
        }

        let cells = Array2::from_shape_fn((usize::from(rows), usize::from(cols)), |(row, col)| {
            let (row, col) = (row as Coord, col as Coord);
            Cell::new(row, col, mult(row, cols) + CellCount::from(col))
        });

        Ok(Self {
            cells,
            mine_count,
            flagged_count: Saturating(0),
            mines_placed: false,
            powerup_config,
        })
    }

    pub fn from_config(config: &BoardConfig, powerup_config: PowerupConfig) -> Result<Self> {
        Self::new(config.rows, config.cols, config.mines, powerup_config)
    }

    /// Builds a board with mines and power-ups already in place.
    pub fn from_layout(
        rows: Coord,
        cols: Coord,
        mines: &[Coord2],
        powerups: &[(Coord2, PowerupKind)],
        powerup_config: PowerupConfig,
    ) -> Result<Self> {
        let mut board = Self::new(rows, cols, 0, powerup_config)?;

        for &coords in mines {
            let cell = board
                .cells
                .get_mut(coords.to_nd_index())
                .ok_or(GameError::InvalidCoords)?;
            if !cell.is_mine {
                cell.is_mine = true;
                board.mine_count += 1;
            }
        }

        for &(coords, kind) in powerups {
            let cell = board
                .cells
                .get_mut(coords.to_nd_index())
                .ok_or(GameError::InvalidCoords)?;
            if cell.is_mine {
                return Err(GameError::InvalidLayout);
            }
            cell.powerup = Some(kind);
        }

        board.update_adjacent_counts();
        board.mines_placed = true;
        Ok(board)
    }

    pub fn size(&self) -> Coord2 {
        let (rows, cols) = self.cells.dim();
        (rows as Coord, cols as Coord)
    }

    pub fn rows(&self) -> Coord {
        self.size().0
    }

    pub fn cols(&self) -> Coord {
        self.size().1
    }

    /// Requested count before placement, actual count after.
    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn flagged_count(&self) -> CellCount {
        self.flagged_count.0
    }

    /// How many mines have not been flagged yet, negative when over-flagged
    pub fn mines_left(&self) -> isize {
        (self.mine_count as isize) - (self.flagged_count.0 as isize)
    }

    pub fn mines_placed(&self) -> bool {
        self.mines_placed
    }

    pub fn powerup_config(&self) -> &PowerupConfig {
        &self.powerup_config
    }

    pub fn contains(&self, coords: Coord2) -> bool {
        let (rows, cols) = self.size();
        coords.0 < rows && coords.1 < cols
    }

    pub fn cell(&self, coords: Coord2) -> Option<&Cell> {
        self.cells.get(coords.to_nd_index())
    }

    /// All cells in row-major order, so `index` matches the position.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Lays mines outside the 3x3 safe zone around `safe`, then spawns power-ups.
    pub fn place_mines<R: RandomSource + ?Sized>(&mut self, safe: Coord2, rng: &mut R) {
        if self.mines_placed {
            return;
        }
        if !self.contains(safe) {
            log::warn!("Safe cell {:?} is outside the board, mines not placed", safe);
            return;
        }

        let mut safe_zone: Neighbors = self.cells.iter_neighbors(safe).collect();
        safe_zone.push(safe);

        let mut candidates: Vec<Coord2> = self
            .cells
            .iter()
            .map(Cell::coords)
            .filter(|coords| !safe_zone.contains(coords))
            .collect();
        shuffle(&mut candidates, rng);

        let requested = usize::from(self.mine_count);
        let placed = requested.min(candidates.len());
        if placed < requested {
            log::warn!(
                "Minefield too small, requested {} mines but only {} fit outside the safe zone",
                requested,
                placed
            );
        }

        for &coords in &candidates[..placed] {
            self.cells[coords.to_nd_index()].is_mine = true;
        }
        // `placed` never exceeds the requested `CellCount`
        self.mine_count = placed as CellCount;

        self.update_adjacent_counts();
        if self.powerup_config.enabled {
            self.spawn_powerups(rng);
        }

        self.mines_placed = true;
        log::debug!(
            "Placed {} mines around safe cell {:?} on a {:?} board",
            self.mine_count,
            safe,
            self.size()
        );
    }

    fn update_adjacent_counts(&mut self) {
        let (rows, cols) = self.size();
        for row in 0..rows {
            for col in 0..cols {
                let coords = (row, col);
                let count = self.count_neighbors(coords, |cell| cell.is_mine);
                let cell = &mut self.cells[coords.to_nd_index()];
                cell.adjacent_mines = if cell.is_mine { 0 } else { count };
            }
        }
    }

    fn spawn_powerups<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        let kinds: SmallVec<[PowerupKind; 4]> = self.powerup_config.kinds().collect();
        if kinds.is_empty() {
            return;
        }

        let spawn_chance = self.powerup_config.spawn_chance;
        let mut spawned = 0;
        for cell in self.cells.iter_mut() {
            if cell.is_mine || cell.adjacent_mines == 0 {
                continue;
            }
            if rng.chance(spawn_chance) {
                cell.powerup = Some(kinds[rng.below(kinds.len())]);
                spawned += 1;
            }
        }
        log::debug!("Spawned {} power-ups", spawned);
    }

    /// Opens a cell, flood-filling from zero cells.
    ///
    /// The fill runs off an explicit work list and stops on the first mine or
    /// power-up it opens, so a pickup is always the last cell of a cascade.
    pub fn reveal_cell(&mut self, coords: Coord2) -> RevealResult {
        let mut result = RevealResult::default();

        match self.cell(coords) {
            Some(cell) if cell.is_openable() => {}
            _ => return result,
        }

        let mut to_visit = VecDeque::from([coords]);
        while let Some(visit_coords) = to_visit.pop_front() {
            let cell = &mut self.cells[visit_coords.to_nd_index()];
            if !cell.is_openable() {
                continue;
            }

            cell.is_revealed = true;
            cell.mark = CellMark::Unmarked;
            let cell = *cell;
            result.revealed.push(visit_coords);

            if cell.is_mine {
                log::debug!("Mine hit at {:?}", visit_coords);
                result.hit_mine = true;
                result.exploded_cell = Some(visit_coords);
                break;
            }

            if let Some(kind) = cell.powerup {
                log::debug!("Power-up {:?} found at {:?}", kind, visit_coords);
                result.powerup = Some(kind);
                break;
            }

            if cell.adjacent_mines == 0 {
                let cells = &self.cells;
                to_visit.extend(cells.iter_neighbors(visit_coords).filter(|&pos| {
                    let neighbor = &cells[pos.to_nd_index()];
                    neighbor.is_openable() && !neighbor.is_mine
                }));
            }
            log::trace!(
                "Opened {:?} with {} adjacent mines",
                visit_coords,
                cell.adjacent_mines
            );
        }

        result
    }

    /// Opens every unflagged neighbor of a revealed number once its flags add up.
    pub fn chord_reveal(&mut self, coords: Coord2) -> RevealResult {
        let mut result = RevealResult::default();

        let Some(&target) = self.cell(coords) else {
            return result;
        };
        if !target.is_revealed || target.adjacent_mines == 0 {
            return result;
        }
        if self.count_neighbors(coords, Cell::is_flagged) != target.adjacent_mines {
            return result;
        }

        for pos in self.cells.iter_neighbors(coords) {
            if self.cells[pos.to_nd_index()].is_openable() {
                result |= self.reveal_cell(pos);
            }
        }
        result
    }

    /// Cycles unmarked, flagged, questioned.
    pub fn toggle_flag(&mut self, coords: Coord2) -> FlagResult {
        let Some(cell) = self.cells.get_mut(coords.to_nd_index()) else {
            return FlagResult::NO_CHANGE;
        };
        if cell.is_revealed {
            return FlagResult::NO_CHANGE;
        }

        let was_flagged = cell.is_flagged();
        cell.mark = cell.mark.next();
        let cell = *cell;

        if was_flagged {
            self.flagged_count -= 1;
        } else if cell.is_flagged() {
            self.flagged_count += 1;
        }

        FlagResult {
            changed: true,
            cell: Some(cell),
        }
    }

    /// Every safe cell is open. Marks on mines do not matter.
    pub fn check_win(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_mine || cell.is_revealed)
    }

    /// End-of-game display: opens unflagged mines and marks wrong flags.
    ///
    /// Returns every unflagged mine, including one that already went off, and
    /// every wrong flag, in row-major order.
    pub fn reveal_all_mines(&mut self) -> Vec<Cell> {
        let mut affected = Vec::new();
        for cell in self.cells.iter_mut() {
            if cell.is_mine && !cell.is_flagged() {
                cell.is_revealed = true;
                cell.mark = CellMark::Unmarked;
                affected.push(*cell);
            } else if !cell.is_mine && cell.is_flagged() {
                cell.wrong_flag = true;
                affected.push(*cell);
            }
        }
        affected
    }

    /// Flags every mine the player left unmarked, for the win display.
    pub fn flag_remaining_mines(&mut self) -> Vec<Cell> {
        let mut affected = Vec::new();
        for cell in self.cells.iter_mut() {
            if cell.is_mine && !cell.is_revealed && !cell.is_flagged() {
                cell.mark = CellMark::Flagged;
                affected.push(*cell);
            }
        }
        self.flagged_count += affected.len() as CellCount;
        affected
    }

    /// Turns an exploded mine back into a hidden, flagged cell.
    pub(crate) fn cover_with_flag(&mut self, coords: Coord2) -> Option<Cell> {
        let cell = self.cells.get_mut(coords.to_nd_index())?;
        if !cell.is_mine || !cell.is_revealed {
            return None;
        }

        cell.is_revealed = false;
        cell.mark = CellMark::Flagged;
        let cell = *cell;
        self.flagged_count += 1;
        Some(cell)
    }

    pub fn random_safe_cell<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Option<Coord2> {
        self.pick_random(rng, |cell| !cell.is_mine && cell.is_openable())
    }

    pub fn random_unflagged_mine<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Option<Coord2> {
        self.pick_random(rng, |cell| cell.is_mine && cell.is_openable())
    }

    fn pick_random<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        eligible: impl Fn(&Cell) -> bool,
    ) -> Option<Coord2> {
        let candidates: Vec<Coord2> = self
            .cells
            .iter()
            .filter(|&cell| eligible(cell))
            .map(Cell::coords)
            .collect();

        if candidates.is_empty() {
            None
        } else {
            Some(candidates[rng.below(candidates.len())])
        }
    }

    fn count_neighbors(&self, coords: Coord2, pred: impl Fn(&Cell) -> bool) -> u8 {
        // at most eight neighbors
        self.cells
            .iter_neighbors(coords)
            .filter(|&pos| pred(&self.cells[pos.to_nd_index()]))
            .count() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;
    use alloc::vec;

    fn layout(rows: Coord, cols: Coord, mines: &[Coord2]) -> Board {
        Board::from_layout(rows, cols, mines, &[], PowerupConfig::disabled()).unwrap()
    }

    fn placed(config: BoardConfig, safe: Coord2, seed: u64) -> Board {
        let mut board = Board::from_config(&config, PowerupConfig::disabled()).unwrap();
        board.place_mines(safe, &mut SeededRandom::new(seed));
        board
    }

    fn assert_no_duplicates(revealed: &[Coord2]) {
        let mut sorted = revealed.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), revealed.len(), "duplicates in {:?}", revealed);
    }

    fn sorted(mut coords: Vec<Coord2>) -> Vec<Coord2> {
        coords.sort_unstable();
        coords
    }

    #[test]
    fn new_rejects_empty_dimensions() {
        assert_eq!(
            Board::new(0, 5, 1, PowerupConfig::disabled()),
            Err(GameError::InvalidDimensions)
        );
        assert_eq!(
            Board::new(5, 0, 1, PowerupConfig::disabled()),
            Err(GameError::InvalidDimensions)
        );
    }

    #[test]
    fn new_lays_out_unrevealed_cells_in_row_major_order() {
        let board = Board::new(3, 4, 2, PowerupConfig::disabled()).unwrap();

        assert_eq!(board.size(), (3, 4));
        assert!(!board.mines_placed());
        assert_eq!(board.cells().count(), 12);
        for (i, cell) in board.cells().enumerate() {
            assert_eq!(usize::from(cell.index), i);
            assert!(!cell.is_mine && !cell.is_revealed);
            assert_eq!(cell.mark, CellMark::Unmarked);
        }
        assert_eq!(board.cell((1, 2)).unwrap().index, 6);
        assert_eq!(board.cell((3, 0)), None);
    }

    #[test]
    fn safe_zone_is_mine_free_for_any_click() {
        let configs = [
            BoardConfig::beginner(),
            BoardConfig::expert(),
            BoardConfig::new(3, 3, 9),
            BoardConfig::new(4, 4, 15),
            BoardConfig::new(1, 1, 1),
            BoardConfig::new(2, 5, 10),
        ];

        for config in configs {
            for seed in 0..4 {
                let (rows, cols) = (config.rows, config.cols);
                let clicks = [
                    (0, 0),
                    (rows - 1, cols - 1),
                    (rows / 2, cols / 2),
                    (0, cols - 1),
                ];
                for safe in clicks {
                    let board = placed(config, safe, seed);
                    let zone: Vec<Coord2> = NeighborIter::new(safe, (rows, cols))
                        .chain([safe])
                        .collect();

                    for &coords in &zone {
                        assert!(!board.cell(coords).unwrap().is_mine, "{:?}", coords);
                    }
                    let fit = config.total_cells() - zone.len() as CellCount;
                    let expected = config.mines.min(fit);
                    assert_eq!(board.mine_count(), expected);
                    assert_eq!(
                        board.cells().filter(|cell| cell.is_mine).count(),
                        usize::from(expected)
                    );
                }
            }
        }
    }

    #[test]
    fn adjacent_counts_match_brute_force() {
        let board = placed(BoardConfig::expert(), (8, 15), 3);
        let mines: Vec<Coord2> = board
            .cells()
            .filter(|cell| cell.is_mine)
            .map(Cell::coords)
            .collect();

        for cell in board.cells().filter(|cell| !cell.is_mine) {
            let expected = mines
                .iter()
                .filter(|&&(row, col)| {
                    (row, col) != cell.coords()
                        && row.abs_diff(cell.row) <= 1
                        && col.abs_diff(cell.col) <= 1
                })
                .count();
            assert_eq!(usize::from(cell.adjacent_mines), expected, "{:?}", cell);
        }
    }

    #[test]
    fn placement_follows_the_random_source() {
        // zero picks rotate the candidates (0,2), (0,3), (0,4) to (0,3) first
        let mut board = Board::new(1, 5, 1, PowerupConfig::disabled()).unwrap();
        board.place_mines((0, 0), &mut ScriptedRandom::default());

        let mines: Vec<Coord2> = board
            .cells()
            .filter(|cell| cell.is_mine)
            .map(Cell::coords)
            .collect();
        assert_eq!(mines, vec![(0, 3)]);
        assert_eq!(board.cell((0, 2)).unwrap().adjacent_mines, 1);
        assert_eq!(board.cell((0, 4)).unwrap().adjacent_mines, 1);
        assert_eq!(board.cell((0, 1)).unwrap().adjacent_mines, 0);
    }

    #[test]
    fn mine_count_is_clamped_to_fit_outside_safe_zone() {
        let board = placed(BoardConfig::new(3, 3, 5), (1, 1), 0);
        assert_eq!(board.mine_count(), 0);
        assert!(board.mines_placed());

        let board = placed(BoardConfig::new(4, 4, 20), (0, 0), 0);
        assert_eq!(board.mine_count(), 12);
    }

    #[test]
    fn place_mines_runs_only_once() {
        let mut board = placed(BoardConfig::beginner(), (0, 0), 11);
        let before = board.clone();

        board.place_mines((8, 8), &mut SeededRandom::new(99));

        assert_eq!(board, before);
    }

    #[test]
    fn out_of_bounds_safe_cell_places_nothing() {
        let mut board = Board::new(3, 3, 2, PowerupConfig::disabled()).unwrap();
        board.place_mines((3, 0), &mut SeededRandom::new(0));

        assert!(!board.mines_placed());
    }

    #[test]
    fn powerups_spawn_only_on_numbered_safe_cells() {
        let mut board =
            Board::from_config(&BoardConfig::beginner(), PowerupConfig::enabled(1.0)).unwrap();
        board.place_mines((4, 4), &mut SeededRandom::new(5));

        for cell in board.cells() {
            let should_spawn = !cell.is_mine && cell.adjacent_mines > 0;
            assert_eq!(cell.powerup.is_some(), should_spawn, "{:?}", cell);
        }
    }

    #[test]
    fn powerup_kind_comes_from_configured_types() {
        let mut config = PowerupConfig::enabled(1.0);
        config
            .types
            .retain(|&kind, _| kind == PowerupKind::Freeze);
        let mut board = Board::from_config(&BoardConfig::beginner(), config).unwrap();
        board.place_mines((0, 0), &mut SeededRandom::new(8));

        assert!(board.cells().any(|cell| cell.powerup.is_some()));
        assert!(
            board
                .cells()
                .filter_map(|cell| cell.powerup)
                .all(|kind| kind == PowerupKind::Freeze)
        );
    }

    #[test]
    fn disabled_powerups_never_spawn() {
        let mut config = PowerupConfig::enabled(1.0);
        config.enabled = false;
        let mut board = Board::from_config(&BoardConfig::beginner(), config).unwrap();
        board.place_mines((0, 0), &mut SeededRandom::new(8));

        assert!(board.cells().all(|cell| cell.powerup.is_none()));
    }

    #[test]
    fn flood_fill_opens_whole_board() {
        let mut board = layout(3, 3, &[(2, 2)]);

        let result = board.reveal_cell((0, 0));

        assert_eq!(result.revealed.len(), 8);
        assert_no_duplicates(&result.revealed);
        assert!(!result.hit_mine);
        assert_eq!(board.cell((1, 1)).unwrap().adjacent_mines, 1);
        assert!(!board.cell((2, 2)).unwrap().is_revealed);
        assert!(board.check_win());
    }

    #[test]
    fn flood_fill_stops_at_numbered_border() {
        let mut board = layout(3, 5, &[(0, 2), (1, 2), (2, 2)]);

        let result = board.reveal_cell((1, 0));

        assert_eq!(
            sorted(result.revealed.clone()),
            vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]
        );
        assert_no_duplicates(&result.revealed);
        assert_eq!(board.cell((1, 1)).unwrap().adjacent_mines, 3);
        assert!(!board.cell((1, 3)).unwrap().is_revealed);
        assert!(!board.check_win());
    }

    #[test]
    fn flood_fill_skips_flagged_cells() {
        let mut board = layout(1, 5, &[(0, 4)]);
        board.toggle_flag((0, 1));

        let result = board.reveal_cell((0, 0));

        assert_eq!(result.revealed, vec![(0, 0)]);
        assert!(board.cell((0, 1)).unwrap().is_flagged());
    }

    #[test]
    fn flood_fill_opens_questioned_cells() {
        let mut board = layout(1, 4, &[(0, 3)]);
        board.toggle_flag((0, 1));
        board.toggle_flag((0, 1));

        let result = board.reveal_cell((0, 0));

        assert_eq!(result.revealed, vec![(0, 0), (0, 1), (0, 2)]);
        assert_eq!(board.cell((0, 1)).unwrap().mark, CellMark::Unmarked);
    }

    #[test]
    fn reveal_ignores_invalid_targets() {
        let mut board = layout(3, 3, &[(0, 0)]);

        assert!(!board.reveal_cell((3, 0)).has_update());
        assert!(!board.reveal_cell((0, 9)).has_update());

        assert!(board.reveal_cell((2, 2)).has_update());
        assert_eq!(board.reveal_cell((2, 2)), RevealResult::default());

        board.toggle_flag((0, 0));
        assert_eq!(board.reveal_cell((0, 0)), RevealResult::default());
    }

    #[test]
    fn reveal_stops_on_mine() {
        let mut board = layout(3, 3, &[(1, 1)]);

        let result = board.reveal_cell((1, 1));

        assert_eq!(result.revealed, vec![(1, 1)]);
        assert!(result.hit_mine);
        assert_eq!(result.exploded_cell, Some((1, 1)));
        assert_eq!(board.cells().filter(|cell| cell.is_revealed).count(), 1);
    }

    #[test]
    fn powerup_cell_ends_the_cascade() {
        let mut board = Board::from_layout(
            1,
            6,
            &[(0, 5)],
            &[((0, 1), PowerupKind::Shield)],
            PowerupConfig::disabled(),
        )
        .unwrap();

        let result = board.reveal_cell((0, 0));

        assert_eq!(result.revealed, vec![(0, 0), (0, 1)]);
        assert_eq!(result.powerup, Some(PowerupKind::Shield));
        assert!(!board.cell((0, 2)).unwrap().is_revealed);
    }

    #[test]
    fn zero_cell_component_is_fully_opened() {
        for seed in 0..8 {
            let mut board = placed(BoardConfig::beginner(), (4, 4), seed);
            for row in 3..=5 {
                for col in 3..=5 {
                    assert!(!board.cell((row, col)).unwrap().is_mine);
                }
            }
            assert_eq!(board.cell((4, 4)).unwrap().adjacent_mines, 0);

            let result = board.reveal_cell((4, 4));

            assert!(!result.hit_mine);
            assert_no_duplicates(&result.revealed);
            for &coords in &result.revealed {
                let cell = *board.cell(coords).unwrap();
                assert!(cell.is_revealed && !cell.is_mine);
                if cell.adjacent_mines == 0 {
                    for pos in NeighborIter::new(coords, board.size()) {
                        assert!(board.cell(pos).unwrap().is_revealed, "{:?}", pos);
                    }
                }
            }
        }
    }

    #[test]
    fn chord_requires_exact_flag_count() {
        let mut board = layout(3, 3, &[(0, 0), (0, 1), (0, 2)]);
        board.reveal_cell((1, 1));
        assert_eq!(board.cell((1, 1)).unwrap().adjacent_mines, 3);

        board.toggle_flag((0, 0));
        board.toggle_flag((0, 1));
        assert_eq!(board.chord_reveal((1, 1)), RevealResult::default());

        board.toggle_flag((0, 2));
        let result = board.chord_reveal((1, 1));

        assert_eq!(
            sorted(result.revealed.clone()),
            vec![(1, 0), (1, 2), (2, 0), (2, 1), (2, 2)]
        );
        assert_no_duplicates(&result.revealed);
        assert!(!result.hit_mine);
        assert!(board.check_win());
    }

    #[test]
    fn chord_with_too_many_flags_does_nothing() {
        let mut board = layout(3, 3, &[(0, 0), (0, 1), (0, 2)]);
        board.reveal_cell((1, 1));
        for coords in [(0, 0), (0, 1), (0, 2), (1, 0)] {
            board.toggle_flag(coords);
        }

        assert_eq!(board.chord_reveal((1, 1)), RevealResult::default());
    }

    #[test]
    fn chord_ignores_hidden_and_zero_cells() {
        let mut board = layout(3, 3, &[(2, 2)]);

        assert_eq!(board.chord_reveal((1, 1)), RevealResult::default());
        assert_eq!(board.chord_reveal((5, 5)), RevealResult::default());

        board.reveal_cell((0, 0));
        assert_eq!(board.chord_reveal((0, 0)), RevealResult::default());
    }

    #[test]
    fn chord_with_wrong_flag_explodes_and_still_opens_the_rest() {
        let mut board = layout(3, 3, &[(0, 0), (2, 2)]);
        board.reveal_cell((1, 1));
        board.toggle_flag((0, 0));
        board.toggle_flag((0, 2));

        let result = board.chord_reveal((1, 1));

        assert!(result.hit_mine);
        assert_eq!(result.exploded_cell, Some((2, 2)));
        assert_eq!(
            sorted(result.revealed.clone()),
            vec![(0, 1), (1, 0), (1, 2), (2, 0), (2, 1), (2, 2)]
        );
    }

    #[test]
    fn chord_surfaces_first_powerup() {
        let mut board = Board::from_layout(
            2,
            3,
            &[(0, 0)],
            &[((1, 0), PowerupKind::Freeze), ((1, 2), PowerupKind::Detector)],
            PowerupConfig::disabled(),
        )
        .unwrap();
        board.reveal_cell((0, 1));
        board.toggle_flag((0, 0));

        // (0, 2) cascades into the detector before (1, 0) is reached
        let result = board.chord_reveal((0, 1));

        assert_eq!(result.powerup, Some(PowerupKind::Detector));
        assert!(board.cell((1, 2)).unwrap().is_revealed);
        assert!(board.cell((1, 0)).unwrap().is_revealed);
        assert_no_duplicates(&result.revealed);
    }

    #[test]
    fn toggle_flag_cycles_and_tracks_count() {
        let mut board = layout(2, 2, &[(0, 0)]);

        let result = board.toggle_flag((0, 0));
        assert!(result.has_update());
        assert!(result.cell.unwrap().is_flagged());
        assert_eq!(board.flagged_count(), 1);
        assert_eq!(board.mines_left(), 0);

        let result = board.toggle_flag((0, 0));
        assert!(result.cell.unwrap().is_questioned());
        assert_eq!(board.flagged_count(), 0);

        let result = board.toggle_flag((0, 0));
        assert_eq!(result.cell.unwrap().mark, CellMark::Unmarked);
        assert_eq!(board.mines_left(), 1);
    }

    #[test]
    fn toggle_flag_ignores_revealed_and_out_of_bounds() {
        let mut board = layout(2, 2, &[(0, 0)]);
        board.reveal_cell((1, 1));

        assert_eq!(board.toggle_flag((1, 1)), FlagResult::NO_CHANGE);
        assert_eq!(board.toggle_flag((2, 0)), FlagResult::NO_CHANGE);
    }

    #[test]
    fn win_ignores_marks_on_mines() {
        let mut board = layout(1, 2, &[(0, 0)]);
        assert!(!board.check_win());

        board.toggle_flag((0, 0));
        board.reveal_cell((0, 1));

        assert!(board.check_win());
    }

    #[test]
    fn unplaced_board_is_never_won() {
        let board = Board::new(2, 2, 1, PowerupConfig::disabled()).unwrap();

        assert!(!board.check_win());
    }

    #[test]
    fn reveal_all_mines_marks_wrong_flags() {
        let mut board = layout(2, 3, &[(0, 0), (0, 1)]);
        board.toggle_flag((0, 0));
        board.toggle_flag((1, 2));

        let affected = board.reveal_all_mines();

        assert_eq!(affected.len(), 2);
        let mine = board.cell((0, 1)).unwrap();
        assert!(mine.is_revealed);
        let wrong = board.cell((1, 2)).unwrap();
        assert!(wrong.wrong_flag && !wrong.is_revealed);
        let flagged = board.cell((0, 0)).unwrap();
        assert!(flagged.is_flagged() && !flagged.is_revealed && !flagged.wrong_flag);
    }

    #[test]
    fn reveal_all_mines_includes_exploded_mine() {
        let mut board = layout(1, 4, &[(0, 1), (0, 3)]);
        assert!(board.reveal_cell((0, 3)).hit_mine);

        let affected: Vec<Coord2> = board.reveal_all_mines().iter().map(Cell::coords).collect();

        assert_eq!(affected, [(0, 1), (0, 3)]);
        assert!(board.cell((0, 3)).unwrap().is_revealed);
    }

    #[test]
    fn nan_spawn_chance_spawns_nothing() {
        let mut board =
            Board::from_config(&BoardConfig::beginner(), PowerupConfig::enabled(f64::NAN)).unwrap();

        board.place_mines((4, 4), &mut SeededRandom::new(2));

        assert!(board.mines_placed());
        assert!(board.cells().all(|cell| cell.powerup.is_none()));
    }

    #[test]
    fn flagged_count_tracks_only_flag_marks() {
        let mut board = layout(2, 2, &[(0, 0)]);
        board.toggle_flag((0, 0));
        board.toggle_flag((0, 1));
        board.toggle_flag((0, 1));

        assert_eq!(board.flagged_count(), 1);
        assert_eq!(board.mines_left(), 0);
    }

    #[test]
    fn flag_remaining_mines_counts_new_flags() {
        let mut board = layout(2, 3, &[(0, 0), (0, 1)]);
        board.toggle_flag((0, 0));

        let affected = board.flag_remaining_mines();

        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].coords(), (0, 1));
        assert_eq!(board.mines_left(), 0);
    }

    #[test]
    fn cover_with_flag_hides_exploded_mine() {
        let mut board = layout(2, 2, &[(0, 0)]);
        board.reveal_cell((0, 0));

        let cell = board.cover_with_flag((0, 0)).unwrap();

        assert!(!cell.is_revealed && cell.is_flagged());
        assert_eq!(board.flagged_count(), 1);
        assert_eq!(board.cover_with_flag((1, 1)), None);
    }

    #[test]
    fn random_picks_respect_eligibility() {
        let mut board = layout(2, 2, &[(0, 0), (1, 1)]);

        let mut rng = ScriptedRandom::new(&[1, 1], &[]);
        assert_eq!(board.random_safe_cell(&mut rng), Some((1, 0)));
        assert_eq!(board.random_unflagged_mine(&mut rng), Some((1, 1)));

        board.reveal_cell((0, 1));
        board.reveal_cell((1, 0));
        board.toggle_flag((0, 0));
        board.toggle_flag((1, 1));

        assert_eq!(board.random_safe_cell(&mut rng), None);
        assert_eq!(board.random_unflagged_mine(&mut rng), None);
    }

    #[test]
    fn from_layout_validates_positions() {
        assert_eq!(
            Board::from_layout(2, 2, &[(2, 0)], &[], PowerupConfig::disabled()),
            Err(GameError::InvalidCoords)
        );
        assert_eq!(
            Board::from_layout(
                2,
                2,
                &[(0, 0)],
                &[((0, 0), PowerupKind::Shield)],
                PowerupConfig::disabled()
            ),
            Err(GameError::InvalidLayout)
        );

        let board = layout(2, 2, &[(0, 0), (0, 0)]);
        assert_eq!(board.mine_count(), 1);
        assert!(board.mines_placed());
    }
}
