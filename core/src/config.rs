use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::ToString;
use serde::{Deserialize, Serialize};

use crate::*;

pub const DEFAULT_SPAWN_CHANCE: f64 = 0.1;
pub const DEFAULT_DETECTOR_MS: Millis = 3_000;
pub const DEFAULT_FREEZE_MS: Millis = 10_000;
pub const DEFAULT_SAFE_REVEAL_CELLS: u8 = 3;
pub const DEFAULT_MAX_TIMER_SECONDS: u32 = 999;

/// Grid size and requested mine count.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub rows: Coord,
    pub cols: Coord,
    pub mines: CellCount,
}

impl BoardConfig {
    pub const fn new(rows: Coord, cols: Coord, mines: CellCount) -> Self {
        Self { rows, cols, mines }
    }

    pub const fn beginner() -> Self {
        Self::new(9, 9, 10)
    }

    pub const fn intermediate() -> Self {
        Self::new(16, 16, 40)
    }

    pub const fn expert() -> Self {
        Self::new(16, 30, 99)
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.rows, self.cols)
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::beginner()
    }
}

/// Per-kind tuning. Timed kinds read `duration`, safe-reveal reads `cell_count`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerupParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Millis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_count: Option<u8>,
}

impl PowerupParams {
    pub const fn timed(duration: Millis) -> Self {
        Self {
            duration: Some(duration),
            cell_count: None,
        }
    }

    pub const fn cells(cell_count: u8) -> Self {
        Self {
            duration: None,
            cell_count: Some(cell_count),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PowerupConfig {
    pub enabled: bool,
    pub spawn_chance: f64,
    /// Kinds eligible to spawn, with their tuning.
    pub types: BTreeMap<PowerupKind, PowerupParams>,
}

impl PowerupConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled(spawn_chance: f64) -> Self {
        Self {
            enabled: true,
            spawn_chance,
            ..Self::default()
        }
    }

    pub fn kinds(&self) -> impl Iterator<Item = PowerupKind> + '_ {
        self.types.keys().copied()
    }

    pub fn detector_duration(&self) -> Millis {
        self.duration_of(PowerupKind::Detector)
            .unwrap_or(DEFAULT_DETECTOR_MS)
    }

    pub fn freeze_duration(&self) -> Millis {
        self.duration_of(PowerupKind::Freeze)
            .unwrap_or(DEFAULT_FREEZE_MS)
    }

    pub fn safe_reveal_cells(&self) -> u8 {
        self.types
            .get(&PowerupKind::SafeReveal)
            .and_then(|params| params.cell_count)
            .unwrap_or(DEFAULT_SAFE_REVEAL_CELLS)
    }

    fn duration_of(&self, kind: PowerupKind) -> Option<Millis> {
        self.types.get(&kind).and_then(|params| params.duration)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.spawn_chance) {
            return Err(GameError::InvalidConfig(format!(
                "spawnChance must be within [0, 1], got {}",
                self.spawn_chance
            )));
        }
        Ok(())
    }
}

impl Default for PowerupConfig {
    fn default() -> Self {
        let types = BTreeMap::from([
            (PowerupKind::Shield, PowerupParams::default()),
            (PowerupKind::Detector, PowerupParams::timed(DEFAULT_DETECTOR_MS)),
            (PowerupKind::Freeze, PowerupParams::timed(DEFAULT_FREEZE_MS)),
            (
                PowerupKind::SafeReveal,
                PowerupParams::cells(DEFAULT_SAFE_REVEAL_CELLS),
            ),
        ]);
        Self {
            enabled: false,
            spawn_chance: DEFAULT_SPAWN_CHANCE,
            types,
        }
    }
}

/// Everything a session needs to build and run boards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub board: BoardConfig,
    #[serde(default)]
    pub powerups: PowerupConfig,
    #[serde(default = "default_max_timer_seconds")]
    pub max_timer_seconds: u32,
}

fn default_max_timer_seconds() -> u32 {
    DEFAULT_MAX_TIMER_SECONDS
}

impl SessionConfig {
    pub fn new(board: BoardConfig, powerups: PowerupConfig) -> Self {
        Self {
            board,
            powerups,
            max_timer_seconds: DEFAULT_MAX_TIMER_SECONDS,
        }
    }

    /// Parses a JSON document. Reading it from disk is left to the host.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| GameError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.board.rows == 0 || self.board.cols == 0 {
            return Err(GameError::InvalidDimensions);
        }
        self.powerups.validate()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(BoardConfig::default(), PowerupConfig::default())
    }
}
