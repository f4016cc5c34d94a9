use serde::{Deserialize, Serialize};

use crate::*;

/// Player mark on an unrevealed cell, cycled by flag toggling.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellMark {
    #[default]
    Unmarked,
    Flagged,
    Questioned,
}

impl CellMark {
    pub const fn next(self) -> Self {
        match self {
            Self::Unmarked => Self::Flagged,
            Self::Flagged => Self::Questioned,
            Self::Questioned => Self::Unmarked,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub row: Coord,
    pub col: Coord,
    /// `row * cols + col`
    pub index: CellCount,
    pub is_mine: bool,
    pub is_revealed: bool,
    pub mark: CellMark,
    /// Only meaningful for non-mine cells once mines are placed.
    pub adjacent_mines: u8,
    pub powerup: Option<PowerupKind>,
    /// Set on flagged non-mine cells when the game ends.
    pub wrong_flag: bool,
}

impl Cell {
    pub(crate) const fn new(row: Coord, col: Coord, index: CellCount) -> Self {
        Self {
            row,
            col,
            index,
            is_mine: false,
            is_revealed: false,
            mark: CellMark::Unmarked,
            adjacent_mines: 0,
            powerup: None,
            wrong_flag: false,
        }
    }

    pub const fn coords(&self) -> Coord2 {
        (self.row, self.col)
    }

    pub const fn is_flagged(&self) -> bool {
        matches!(self.mark, CellMark::Flagged)
    }

    pub const fn is_questioned(&self) -> bool {
        matches!(self.mark, CellMark::Questioned)
    }

    /// Hidden and not protected by a flag, so a reveal may open it.
    pub const fn is_openable(&self) -> bool {
        !self.is_revealed && !self.is_flagged()
    }
}
