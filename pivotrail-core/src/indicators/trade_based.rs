//! Dispatch for position-aware indicators.
//!
//! A [`TradeBasedIndicator`] looks up the latest ledger event at or before the
//! queried index and calls the entry or exit branch of its [`TradeBased`]
//! implementation. How events get registered is not its concern.

use super::ledger::{LedgerError, LedgerSource, TradeEvent, TradeLedger};
use super::{Indicator, IndicatorContext, IndicatorValue};
use crate::domain::MarketEnterType;

/// Entry/exit branches of a trade-aware indicator.
pub trait TradeBased {
    type Output: IndicatorValue;

    fn name(&self) -> &str;

    /// Value while a position opened at `entry_index` is the latest event.
    fn on_entry(
        &mut self,
        ctx: &IndicatorContext<'_>,
        entry_index: usize,
        enter_type: MarketEnterType,
        index: usize,
    ) -> Self::Output;

    /// Value while an exit at `exit_index` is the latest event.
    fn on_exit(&mut self, ctx: &IndicatorContext<'_>, exit_index: usize, index: usize)
        -> Self::Output;
}

/// Adapts a [`TradeBased`] implementation into an [`Indicator`].
#[derive(Debug, Clone)]
pub struct TradeBasedIndicator<T> {
    inner: T,
    ledger: LedgerSource,
}

impl<T: TradeBased> TradeBasedIndicator<T> {
    /// Keep a private ledger, fed through [`Self::record_entry`] / [`Self::record_exit`].
    pub fn owned(inner: T) -> Self {
        Self {
            inner,
            ledger: LedgerSource::Owned(TradeLedger::new()),
        }
    }

    /// Read events from a ledger held in the context arena.
    pub fn shared(inner: T, ledger: super::LedgerId) -> Self {
        Self {
            inner,
            ledger: LedgerSource::Shared(ledger),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn ledger_source(&self) -> &LedgerSource {
        &self.ledger
    }

    /// Record an entry in an owned ledger. Shared ledgers are written by their owner.
    pub fn record_entry(
        &mut self,
        index: usize,
        enter_type: MarketEnterType,
    ) -> Result<bool, LedgerError> {
        match &mut self.ledger {
            LedgerSource::Owned(ledger) => ledger.record_entry(index, enter_type).map(|_| true),
            LedgerSource::Shared(_) => Ok(false),
        }
    }

    /// Record an exit in an owned ledger. Shared ledgers are written by their owner.
    pub fn record_exit(&mut self, index: usize) -> Result<bool, LedgerError> {
        match &mut self.ledger {
            LedgerSource::Owned(ledger) => ledger.record_exit(index).map(|_| true),
            LedgerSource::Shared(_) => Ok(false),
        }
    }
}

impl<T: TradeBased> Indicator for TradeBasedIndicator<T> {
    type Output = T::Output;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn value(&mut self, ctx: &IndicatorContext<'_>, index: usize) -> Self::Output {
        if index >= ctx.bars.len() {
            return T::Output::not_applicable();
        }
        let event = self.ledger.resolve(ctx.ledgers).last_event_at(index);
        match event {
            None => T::Output::not_applicable(),
            Some(TradeEvent::Entry {
                index: entry_index,
                enter_type,
            }) => self.inner.on_entry(ctx, entry_index, enter_type, index),
            Some(TradeEvent::Exit { index: exit_index }) => {
                self.inner.on_exit(ctx, exit_index, index)
            }
        }
    }
}
