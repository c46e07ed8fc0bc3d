//! Trade event ledger: which bar indices opened and closed a position.
//!
//! Written only by the order tracker, read by every trade-aware indicator.
//! Events are append-only and strictly increasing in index; entries and exits
//! alternate.

use crate::domain::MarketEnterType;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("event at index {index} does not follow the last recorded event at {last}")]
    OutOfOrder { index: usize, last: usize },

    #[error("entry at index {index} while the position opened at {open_since} is still open")]
    AlreadyInPosition { index: usize, open_since: usize },

    #[error("exit at index {index} without an open position")]
    NotInPosition { index: usize },

    #[error("ledger {0:?} does not exist")]
    UnknownLedger(LedgerId),
}

/// Most recent event at or before a queried index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeEvent {
    Entry {
        index: usize,
        enter_type: MarketEnterType,
    },
    Exit {
        index: usize,
    },
}

/// Ordered entry/exit history of one position stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeLedger {
    entries: BTreeMap<usize, MarketEnterType>,
    exits: BTreeSet<usize>,
}

impl TradeLedger {
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            exits: BTreeSet::new(),
        }
    }

    pub fn last_entry_at(&self, index: usize) -> Option<(usize, MarketEnterType)> {
        self.entries
            .range(..=index)
            .next_back()
            .map(|(&i, &t)| (i, t))
    }

    pub fn last_exit_at(&self, index: usize) -> Option<usize> {
        self.exits.range(..=index).next_back().copied()
    }

    /// The most recent event at or before `index`.
    ///
    /// `None` when no entry has been recorded at or before `index`. An entry and
    /// an exit on the same index resolve to the exit.
    pub fn last_event_at(&self, index: usize) -> Option<TradeEvent> {
        let (entry_index, enter_type) = self.last_entry_at(index)?;
        match self.last_exit_at(index) {
            Some(exit_index) if exit_index >= entry_index => {
                Some(TradeEvent::Exit { index: exit_index })
            }
            _ => Some(TradeEvent::Entry {
                index: entry_index,
                enter_type,
            }),
        }
    }

    pub fn is_in_position_at(&self, index: usize) -> bool {
        matches!(self.last_event_at(index), Some(TradeEvent::Entry { .. }))
    }

    /// Entry of the currently open position, if any.
    pub fn open_entry(&self) -> Option<(usize, MarketEnterType)> {
        match self.last_event_at(usize::MAX) {
            Some(TradeEvent::Entry { index, enter_type }) => Some((index, enter_type)),
            _ => None,
        }
    }

    fn last_recorded_index(&self) -> Option<usize> {
        let entry = self.entries.keys().next_back().copied();
        let exit = self.exits.iter().next_back().copied();
        entry.max(exit)
    }

    fn check_order(&self, index: usize) -> Result<(), LedgerError> {
        match self.last_recorded_index() {
            Some(last) if index <= last => Err(LedgerError::OutOfOrder { index, last }),
            _ => Ok(()),
        }
    }

    pub fn record_entry(
        &mut self,
        index: usize,
        enter_type: MarketEnterType,
    ) -> Result<(), LedgerError> {
        self.check_order(index)?;
        if let Some((open_since, _)) = self.open_entry() {
            return Err(LedgerError::AlreadyInPosition { index, open_since });
        }
        self.entries.insert(index, enter_type);
        Ok(())
    }

    pub fn record_exit(&mut self, index: usize) -> Result<(), LedgerError> {
        self.check_order(index)?;
        if self.open_entry().is_none() {
            return Err(LedgerError::NotInPosition { index });
        }
        self.exits.insert(index);
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn exit_count(&self) -> usize {
        self.exits.len()
    }
}

static EMPTY_LEDGER: TradeLedger = TradeLedger::new();

/// Handle to a ledger stored in [`Ledgers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedgerId(usize);

/// Arena of ledgers owned by one strategy instance.
///
/// Indicators refer to a ledger by [`LedgerId`] so several of them can read the
/// one history the order tracker writes.
#[derive(Debug, Clone, Default)]
pub struct Ledgers {
    ledgers: Vec<TradeLedger>,
}

impl Ledgers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self) -> LedgerId {
        self.ledgers.push(TradeLedger::new());
        LedgerId(self.ledgers.len() - 1)
    }

    pub fn get(&self, id: LedgerId) -> Option<&TradeLedger> {
        self.ledgers.get(id.0)
    }

    pub fn get_mut(&mut self, id: LedgerId) -> Result<&mut TradeLedger, LedgerError> {
        self.ledgers
            .get_mut(id.0)
            .ok_or(LedgerError::UnknownLedger(id))
    }
}

/// Where a trade-aware indicator reads its events from.
#[derive(Debug, Clone)]
pub enum LedgerSource {
    /// The indicator keeps its own history.
    Owned(TradeLedger),
    /// Read-only reference to a ledger in the context's arena.
    Shared(LedgerId),
}

impl LedgerSource {
    /// Resolve against the context arena. An unknown shared ID reads as empty.
    pub fn resolve<'a>(&'a self, ledgers: &'a Ledgers) -> &'a TradeLedger {
        match self {
            Self::Owned(ledger) => ledger,
            Self::Shared(id) => ledgers.get(*id).unwrap_or(&EMPTY_LEDGER),
        }
    }
}
