//! Minimal hex-conquest world the scenario handlers mutate.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Gold a single unit costs.
pub const UNIT_COST: u32 = 10;

/// Actions sequenced through the action queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GameAction {
    StartTurn,
    BuyUnit,
    PlaceUnit,
    ConquerHex,
    EndTurn,
}

/// Notifications broadcast on the action bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    PlayerAct,
    TurnEnded,
}

/// Planner resource keys. Only compared, never dereferenced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Hex(u32),
    Treasury,
    Roster,
}

#[derive(Debug, Default)]
pub struct World {
    pub turn: u32,
    pub gold: u32,
    pub units: Vec<u32>,
    pub owned: BTreeSet<u32>,
    pub score: u32,
    pub revealed: BTreeSet<u32>,
}

impl World {
    pub fn new(gold: u32) -> Self {
        Self {
            gold,
            ..Self::default()
        }
    }

    /// Spends `amount` if the treasury covers it.
    pub fn spend(&mut self, amount: u32) -> bool {
        match self.gold.checked_sub(amount) {
            Some(rest) => {
                self.gold = rest;
                true
            }
            None => false,
        }
    }

    pub fn remove_unit(&mut self, hex: u32) {
        if let Some(position) = self.units.iter().rposition(|unit| *unit == hex) {
            self.units.remove(position);
        }
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "turn {} | gold {} | units {:?} | hexes {:?} | score {} | revealed {}",
            self.turn,
            self.gold,
            self.units,
            self.owned,
            self.score,
            self.revealed.len()
        )
    }
}

/// World shared between handlers, undo functions and bus listeners.
#[derive(Clone, Debug, Default)]
pub struct SharedWorld(Arc<Mutex<World>>);

impl SharedWorld {
    pub fn new(world: World) -> Self {
        Self(Arc::new(Mutex::new(world)))
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut World) -> T) -> T {
        let mut world = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut world)
    }
}
