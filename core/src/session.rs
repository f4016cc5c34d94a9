use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

/// Valid transitions:
/// - Idle -> Playing
/// - Playing -> Won
/// - Playing -> Lost
/// - any -> Idle, through `reset`
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Playing,
    Won,
    Lost,
}

impl SessionState {
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    pub const fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }

    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Notifications raised synchronously by a session call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    StateChanged(SessionState),
    InventoryChanged,
    ShieldChanged(bool),
    FreezeChanged(bool),
    DetectorChanged(Option<DetectorHint>),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOutcome {
    #[default]
    NoChange,
    Updated,
    /// A mine went off and the shield absorbed it
    Shielded,
    Won,
    Lost,
}

impl SessionOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// Everything a presentation layer needs to redraw after one call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub outcome: SessionOutcome,
    /// Snapshots taken after the call, in the order cells were touched
    pub cells: Vec<Cell>,
    pub events: Vec<SessionEvent>,
}

impl SessionUpdate {
    pub fn has_update(&self) -> bool {
        self.outcome.has_update() || !self.events.is_empty()
    }
}

/// One game at a time, from first click to win or loss, then reset.
#[derive(Clone, Debug)]
pub struct GameSession<C = SystemClock, R = SeededRandom> {
    config: SessionConfig,
    board: Board,
    modifiers: ModifierSystem,
    state: SessionState,
    elapsed_seconds: u32,
    clock: C,
    rng: R,
}

impl<C: Clock, R: RandomSource> GameSession<C, R> {
    pub fn new(config: SessionConfig, clock: C, rng: R) -> Result<Self> {
        config.validate()?;
        let board = Board::from_config(&config.board, config.powerups.clone())?;
        Ok(Self::with_board(config, board, clock, rng))
    }

    /// Starts on a prepared board. Later resets build boards from `config`.
    pub fn with_board(config: SessionConfig, board: Board, clock: C, rng: R) -> Self {
        let modifiers = ModifierSystem::new(config.powerups.clone());
        Self {
            config,
            board,
            modifiers,
            state: SessionState::Idle,
            elapsed_seconds: 0,
            clock,
            rng,
        }
    }

    /// Discards the current game for a fresh, unplaced board.
    pub fn reset(&mut self) -> Result<()> {
        self.board = Board::from_config(&self.config.board, self.config.powerups.clone())?;
        self.modifiers = ModifierSystem::new(self.config.powerups.clone());
        self.state = SessionState::Idle;
        self.elapsed_seconds = 0;
        log::debug!("Session reset");
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn modifiers(&self) -> &ModifierSystem {
        &self.modifiers
    }

    pub fn mines_left(&self) -> isize {
        self.board.mines_left()
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn is_timer_frozen(&self) -> bool {
        let now = self.clock.now_ms();
        self.modifiers.is_timer_frozen(now)
    }

    pub fn active_detector(&self) -> Option<DetectorHint> {
        let now = self.clock.now_ms();
        self.modifiers.active_detector(now)
    }

    pub fn on_reveal(&mut self, coords: Coord2) -> SessionUpdate {
        let mut update = SessionUpdate::default();

        if self.state.is_finished() {
            return update;
        }
        match self.board.cell(coords) {
            Some(cell) if cell.is_openable() => {}
            _ => return update,
        }

        if !self.board.mines_placed() {
            self.board.place_mines(coords, &mut self.rng);
        }
        if self.state.is_idle() {
            self.transition(SessionState::Playing, &mut update);
        }

        let result = self.board.reveal_cell(coords);
        self.settle(result, &mut update);
        update
    }

    pub fn on_flag(&mut self, coords: Coord2) -> SessionUpdate {
        let mut update = SessionUpdate::default();

        if !self.board.mines_placed() || self.state.is_finished() {
            return update;
        }

        if let Some(cell) = self.board.toggle_flag(coords).cell {
            update.outcome = SessionOutcome::Updated;
            update.cells.push(cell);
        }
        update
    }

    pub fn on_chord(&mut self, coords: Coord2) -> SessionUpdate {
        let mut update = SessionUpdate::default();

        if !self.board.mines_placed() || self.state.is_finished() {
            return update;
        }

        let result = self.board.chord_reveal(coords);
        self.settle(result, &mut update);
        update
    }

    pub fn on_use_modifier(&mut self, kind: PowerupKind) -> SessionUpdate {
        let mut update = SessionUpdate::default();

        if !self.state.is_playing() {
            return update;
        }

        let now = self.clock.now_ms();
        let Some(effect) =
            self.modifiers
                .use_modifier(kind, &mut self.board, &mut self.rng, now)
        else {
            return update;
        };

        update.outcome = SessionOutcome::Updated;
        update.events.push(SessionEvent::InventoryChanged);
        match effect {
            ModifierEffect::Detected(hint) => {
                update.events.push(SessionEvent::DetectorChanged(hint));
            }
            ModifierEffect::Frozen { .. } => {
                update.events.push(SessionEvent::FreezeChanged(true));
            }
            ModifierEffect::SafeRevealed(result) => self.settle(result, &mut update),
        }
        update
    }

    /// Advances the timer by one second unless frozen. Call once per second.
    pub fn tick(&mut self) -> SessionUpdate {
        let mut update = SessionUpdate::default();

        if !self.state.is_playing() {
            return update;
        }

        let now = self.clock.now_ms();
        update.events.extend(self.modifiers.expire(now));

        let frozen = self.modifiers.is_timer_frozen(now);
        if !frozen && self.elapsed_seconds < self.config.max_timer_seconds {
            self.elapsed_seconds += 1;
            update.outcome = SessionOutcome::Updated;
        }
        update
    }

    /// Applies mine, power-up and win handling to the cells a reveal opened.
    fn settle(&mut self, result: RevealResult, update: &mut SessionUpdate) {
        if !result.has_update() {
            return;
        }
        update.outcome = SessionOutcome::Updated;

        let mines: SmallVec<[Coord2; 2]> = result
            .revealed
            .iter()
            .copied()
            .filter(|&coords| self.board.cell(coords).is_some_and(|cell| cell.is_mine))
            .collect();

        let mut mines_left_open = mines.len();
        if let Some(exploded) = result.exploded_cell.or(mines.first().copied()) {
            if self.modifiers.consume_shield() {
                self.board.cover_with_flag(exploded);
                mines_left_open -= 1;
                update.outcome = SessionOutcome::Shielded;
                update.events.push(SessionEvent::ShieldChanged(false));
                log::debug!("Shield absorbed mine at {:?}", exploded);
            }
        }

        if mines_left_open > 0 {
            let shown = self.board.reveal_all_mines();
            update.cells.extend(
                result
                    .revealed
                    .iter()
                    .filter_map(|&pos| self.board.cell(pos))
                    .filter(|cell| shown.iter().all(|other| other.index != cell.index))
                    .copied(),
            );
            update.cells.extend(shown);
            update.outcome = SessionOutcome::Lost;
            self.transition(SessionState::Lost, update);
            return;
        }

        let pickups: SmallVec<[PowerupKind; 2]> = result
            .revealed
            .iter()
            .filter_map(|&coords| self.board.cell(coords))
            .filter(|cell| cell.is_revealed && !cell.is_mine)
            .filter_map(|cell| cell.powerup)
            .collect();
        for kind in pickups {
            let event = self.modifiers.collect(kind);
            update.events.push(event);
        }

        self.push_cells(&result.revealed, update);
        if self.board.check_win() {
            update.cells.extend(self.board.flag_remaining_mines());
            update.outcome = SessionOutcome::Won;
            self.transition(SessionState::Won, update);
        }
    }

    fn push_cells(&self, coords: &[Coord2], update: &mut SessionUpdate) {
        update
            .cells
            .extend(coords.iter().filter_map(|&pos| self.board.cell(pos)).copied());
    }

    fn transition(&mut self, state: SessionState, update: &mut SessionUpdate) {
        if self.state == state {
            return;
        }
        log::debug!(
            "Session {:?} -> {:?} after {}s",
            self.state,
            state,
            self.elapsed_seconds
        );
        self.state = state;
        update.events.push(SessionEvent::StateChanged(state));
    }
}
