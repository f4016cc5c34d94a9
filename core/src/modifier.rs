use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerupKind {
    /// Negates one explosion, active as soon as it is picked up.
    Shield,
    /// Points at a random hidden mine for a while.
    Detector,
    /// Stops the session timer for a while.
    Freeze,
    /// Opens a few random safe cells.
    SafeReveal,
}

impl PowerupKind {
    pub const ALL: [Self; 4] = [Self::Shield, Self::Detector, Self::Freeze, Self::SafeReveal];

    /// Whether a pickup goes into the inventory instead of applying at once
    pub const fn is_inventoried(self) -> bool {
        !matches!(self, Self::Shield)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub kind: PowerupKind,
    pub id: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorHint {
    pub coords: Coord2,
    pub expires_at: Millis,
}

/// What using an inventory item did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifierEffect {
    /// `None` when no hidden unflagged mine was left to point at
    Detected(Option<DetectorHint>),
    Frozen { until: Millis },
    SafeRevealed(RevealResult),
}

/// Power-up inventory and the effects layered over a board.
///
/// Timed effects store an expiry timestamp. Queries compare it against the
/// caller's clock without touching state, and `expire` clears what ran out,
/// reporting each change once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModifierSystem {
    config: PowerupConfig,
    inventory: Vec<InventoryEntry>,
    next_id: u32,
    shield_active: bool,
    freeze_active: bool,
    freeze_expires_at: Millis,
    detector: Option<DetectorHint>,
}

impl ModifierSystem {
    pub fn new(config: PowerupConfig) -> Self {
        Self {
            config,
            inventory: Vec::new(),
            next_id: 0,
            shield_active: false,
            freeze_active: false,
            freeze_expires_at: 0,
            detector: None,
        }
    }

    pub fn inventory(&self) -> &[InventoryEntry] {
        &self.inventory
    }

    pub fn count(&self, kind: PowerupKind) -> usize {
        self.inventory
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }

    pub fn shield_active(&self) -> bool {
        self.shield_active
    }

    /// Raw freeze flag, without checking expiry.
    pub fn freeze_active(&self) -> bool {
        self.freeze_active
    }

    pub fn freeze_expires_at(&self) -> Option<Millis> {
        self.freeze_active.then_some(self.freeze_expires_at)
    }

    /// Raw detector hint, without checking expiry.
    pub fn detector(&self) -> Option<DetectorHint> {
        self.detector
    }

    pub fn collect(&mut self, kind: PowerupKind) -> SessionEvent {
        if !kind.is_inventoried() {
            self.shield_active = true;
            log::debug!("Shield activated");
            return SessionEvent::ShieldChanged(true);
        }

        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.inventory.push(InventoryEntry { kind, id });
        log::debug!("Collected {:?} #{}", kind, id);
        SessionEvent::InventoryChanged
    }

    /// Spends the first `kind` entry from the inventory, `None` if there is none.
    pub fn use_modifier<R: RandomSource + ?Sized>(
        &mut self,
        kind: PowerupKind,
        board: &mut Board,
        rng: &mut R,
        now: Millis,
    ) -> Option<ModifierEffect> {
        let position = self
            .inventory
            .iter()
            .position(|entry| entry.kind == kind)?;
        let entry = self.inventory.remove(position);
        log::debug!("Using {:?} #{}", entry.kind, entry.id);

        let effect = match kind {
            // never inventoried
            PowerupKind::Shield => return None,
            PowerupKind::Detector => {
                let expires_at = now.saturating_add(self.config.detector_duration());
                let hint = board
                    .random_unflagged_mine(rng)
                    .map(|coords| DetectorHint { coords, expires_at });
                if hint.is_some() {
                    self.detector = hint;
                }
                ModifierEffect::Detected(hint)
            }
            PowerupKind::Freeze => {
                let until = now.saturating_add(self.config.freeze_duration());
                self.freeze_active = true;
                self.freeze_expires_at = until;
                ModifierEffect::Frozen { until }
            }
            PowerupKind::SafeReveal => {
                let mut result = RevealResult::default();
                for _ in 0..self.config.safe_reveal_cells() {
                    let Some(coords) = board.random_safe_cell(rng) else {
                        break;
                    };
                    result |= board.reveal_cell(coords);
                }
                ModifierEffect::SafeRevealed(result)
            }
        };
        Some(effect)
    }

    /// Spends the shield if one is up.
    pub fn consume_shield(&mut self) -> bool {
        core::mem::take(&mut self.shield_active)
    }

    pub fn is_timer_frozen(&self, now: Millis) -> bool {
        self.freeze_active && now < self.freeze_expires_at
    }

    pub fn active_detector(&self, now: Millis) -> Option<DetectorHint> {
        self.detector.filter(|hint| now < hint.expires_at)
    }

    /// Clears effects that ran out by `now`, returning one event per cleared effect.
    pub fn expire(&mut self, now: Millis) -> SmallVec<[SessionEvent; 2]> {
        let mut events = SmallVec::new();
        if self.freeze_active && !self.is_timer_frozen(now) {
            self.freeze_active = false;
            log::debug!("Freeze expired at {}", now);
            events.push(SessionEvent::FreezeChanged(false));
        }
        if self.detector.is_some() && self.active_detector(now).is_none() {
            self.detector = None;
            log::debug!("Detector hint expired at {}", now);
            events.push(SessionEvent::DetectorChanged(None));
        }
        events
    }
}
