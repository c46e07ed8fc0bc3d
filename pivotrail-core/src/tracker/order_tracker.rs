//! Order state machine.
//!
//! Every public operation first resumes (once) from the exchange's view of
//! the market, then checks that the tracker is in the state the operation
//! belongs to. A call in the wrong state fails with
//! [`StrategyError::WrongState`] and leaves the tracker untouched.

use super::calculator::{MarketPrice, PriceCalculator};
use super::ratchet::StopRatchet;
use super::sanitize::{entry_amount, sanitize_enter_amount};
use super::state::StrategyState;
use super::{RetryLimits, TickContext};
use crate::domain::{
    ClosedTrade, Market, MarketEnterType, OpenOrder, OrderId, OrderType, PlacedOrder,
};
use crate::error::{StrategyError, TradingError};
use crate::indicators::LedgerId;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct OrderStateTracker {
    market: Market,
    ledger: LedgerId,
    percentage_to_use: f64,
    emergency_stop_balance: f64,
    limits: RetryLimits,
    state: StrategyState,
    resumed: bool,
    enter_order: Option<PlacedOrder>,
    exit_order: Option<PlacedOrder>,
    ratchet: Option<StopRatchet>,
}

impl OrderStateTracker {
    /// `percentage_to_use` is in percent of the counter balance; entries and
    /// exits are recorded in `ledger`.
    pub fn new(
        market: Market,
        ledger: LedgerId,
        percentage_to_use: f64,
        emergency_stop_balance: f64,
    ) -> Self {
        Self {
            market,
            ledger,
            percentage_to_use,
            emergency_stop_balance,
            limits: RetryLimits::default(),
            state: StrategyState::NeedEnter,
            resumed: false,
            enter_order: None,
            exit_order: None,
            ratchet: None,
        }
    }

    pub fn with_retry_limits(mut self, limits: RetryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn ledger(&self) -> LedgerId {
        self.ledger
    }

    pub fn enter_order(&self) -> Option<&PlacedOrder> {
        self.enter_order.as_ref()
    }

    pub fn exit_order(&self) -> Option<&PlacedOrder> {
        self.exit_order.as_ref()
    }

    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    /// State without resuming; `NeedEnter` before the first query.
    pub fn last_known_state(&self) -> StrategyState {
        self.state
    }

    /// Current state, resuming from the exchange on the first call.
    pub fn current_state(&mut self, ctx: &mut TickContext<'_>) -> Result<StrategyState, TradingError> {
        self.ensure_resumed(ctx)?;
        Ok(self.state)
    }

    // ── Resume ─────────────────────────────────────────────────────────

    fn ensure_resumed(&mut self, ctx: &mut TickContext<'_>) -> Result<(), TradingError> {
        if self.resumed {
            return Ok(());
        }
        let orders = ctx
            .open_orders
            .get_or_fetch(ctx.tick, ctx.exchange, &self.market)?
            .to_vec();

        match orders.as_slice() {
            [] => self.resume_without_orders(ctx)?,
            [order] if order.order_type.is_enter() => {
                self.enter_order = Some(adopt(order));
                self.state = StrategyState::WaitForEnter;
            }
            [order] => self.resume_with_exit_order(ctx, order)?,
            many => {
                return Err(StrategyError::AmbiguousResume {
                    open_orders: many.len(),
                }
                .into())
            }
        }

        self.resumed = true;
        info!(market = %self.market, state = %self.state, "tracker resumed");
        Ok(())
    }

    fn resume_without_orders(&mut self, ctx: &mut TickContext<'_>) -> Result<(), TradingError> {
        let base = ctx.exchange.available_balance(&self.market.base)?;
        let minimum = ctx.exchange.minimum_order_volume(&self.market)?;
        if base <= minimum {
            self.state = StrategyState::NeedEnter;
            return Ok(());
        }

        let price = ctx
            .prices
            .last_price()
            .ok_or(StrategyError::NoMarketData)?;
        let index = ctx.index()?;
        ctx.ledgers
            .get_mut(self.ledger)?
            .record_entry(index, MarketEnterType::LongPosition)?;
        self.enter_order = Some(PlacedOrder::new(
            OrderId::synthetic(),
            OrderType::Buy,
            base,
            price,
        ));
        self.state = StrategyState::NeedExit;
        Ok(())
    }

    fn resume_with_exit_order(
        &mut self,
        ctx: &mut TickContext<'_>,
        order: &OpenOrder,
    ) -> Result<(), TradingError> {
        let enter_type = order.order_type.enter_type();
        let last = ctx
            .prices
            .last_price()
            .ok_or(StrategyError::NoMarketData)?;
        let index = ctx.index()?;
        ctx.ledgers
            .get_mut(self.ledger)?
            .record_entry(index, enter_type)?;

        self.enter_order = Some(PlacedOrder::new(
            OrderId::synthetic(),
            enter_type.enter_order_type(),
            order.original_quantity,
            last.max(order.price),
        ));
        self.exit_order = Some(adopt(order));
        self.ratchet = Some(StopRatchet::with_level(enter_type, order.price));
        self.state = StrategyState::WaitForExit;
        Ok(())
    }

    // ── Entry ──────────────────────────────────────────────────────────

    /// Size, sanitize and submit an entry order.
    ///
    /// Skips the tick without a transition when the price is unusable or the
    /// order would breach the emergency stop balance.
    pub fn place_enter_order(
        &mut self,
        ctx: &mut TickContext<'_>,
        calculator: &mut dyn PriceCalculator,
        enter_type: MarketEnterType,
    ) -> Result<(), TradingError> {
        self.ensure_resumed(ctx)?;
        self.expect_state("place_enter_order", StrategyState::NeedEnter)?;
        if self.enter_order.is_some() {
            return Err(StrategyError::OrderAlreadyHeld.into());
        }

        let price = calculator.calculate(&ctx.indicators(), enter_type);
        calculator.log_calculation(price, enter_type);
        if !price.is_finite() || price <= 0.0 {
            warn!(market = %self.market, price, "unusable entry price, skipping tick");
            return Ok(());
        }

        let counter = ctx.exchange.available_balance(&self.market.counter)?;
        let minimum = ctx.exchange.minimum_order_volume(&self.market)?;
        let fee = match enter_type {
            MarketEnterType::LongPosition => ctx.exchange.buy_fee_percentage(&self.market)?,
            MarketEnterType::ShortPosition => ctx.exchange.sell_fee_percentage(&self.market)?,
        };

        let amount = entry_amount(counter, self.percentage_to_use, price);
        let Some(amount) = sanitize_enter_amount(
            amount,
            minimum,
            price,
            fee,
            counter,
            self.emergency_stop_balance,
        ) else {
            warn!(
                market = %self.market,
                counter_balance = counter,
                emergency_stop = self.emergency_stop_balance,
                "entry would breach emergency stop balance, skipping tick"
            );
            return Ok(());
        };

        let order_type = enter_type.enter_order_type();
        let id = ctx
            .exchange
            .create_order(&self.market, order_type, amount, price)?;
        ctx.open_orders.invalidate(ctx.tick);
        info!(market = %self.market, %id, %order_type, amount, price, "entry order placed");

        self.enter_order = Some(PlacedOrder::new(id, order_type, amount, price));
        self.transition(StrategyState::WaitForEnter);
        Ok(())
    }

    /// Watch the running entry order: fill, partial fill or a market that
    /// ran away from it.
    pub fn track_running_enter_order(
        &mut self,
        ctx: &mut TickContext<'_>,
        calculator: &mut dyn PriceCalculator,
    ) -> Result<(), TradingError> {
        self.ensure_resumed(ctx)?;
        self.expect_state("track_running_enter_order", StrategyState::WaitForEnter)?;
        let order = self.enter_order.clone().ok_or(StrategyError::NoOrderHeld)?;
        let enter_type = order.enter_type();

        let open = ctx
            .open_orders
            .find(ctx.tick, ctx.exchange, &self.market, &order.id)?;
        let Some(open) = open else {
            self.register_entry(ctx, enter_type)?;
            info!(market = %self.market, id = %order.id, price = order.price, "entry order filled");
            self.transition(StrategyState::NeedExit);
            return Ok(());
        };

        if open.is_partially_filled() {
            let order = order.with_partially_executed_incremented();
            if order.partially_executed_count <= self.limits.enter_partially_executed {
                debug!(id = %order.id, count = order.partially_executed_count, "entry partially filled");
                self.enter_order = Some(order);
                return Ok(());
            }
            // Read before cancelling: once the remainder is gone the order
            // is indistinguishable from a full fill.
            let held = match enter_type {
                MarketEnterType::LongPosition => {
                    ctx.exchange.available_balance(&self.market.base)?
                }
                MarketEnterType::ShortPosition => open.filled_quantity(),
            };
            if !self.cancel(ctx, &order.id)? {
                self.enter_order = Some(order);
                return Ok(());
            }
            self.register_entry(ctx, enter_type)?;
            info!(market = %self.market, id = %order.id, held, "partial entry accepted");
            self.enter_order = Some(order.with_quantity(held));
            self.transition(StrategyState::NeedExit);
            return Ok(());
        }

        let fresh = calculator.calculate(&ctx.indicators(), enter_type);
        calculator.log_calculation(fresh, enter_type);
        let crossed = match enter_type {
            MarketEnterType::LongPosition => fresh > order.price,
            MarketEnterType::ShortPosition => fresh < order.price,
        };
        if !crossed {
            return Ok(());
        }

        let order = order.with_not_executed_incremented();
        if order.not_executed_count <= self.limits.enter_not_executed {
            debug!(id = %order.id, count = order.not_executed_count, fresh, "entry not executed");
            self.enter_order = Some(order);
            return Ok(());
        }
        if !self.cancel(ctx, &order.id)? {
            self.enter_order = Some(order);
            return Ok(());
        }
        info!(market = %self.market, id = %order.id, "stale entry order cancelled");
        self.enter_order = None;
        self.transition(StrategyState::NeedEnter);
        Ok(())
    }

    // ── Exit ───────────────────────────────────────────────────────────

    /// Submit the exit order: the whole base balance for longs, nothing for
    /// shorts (the exchange covers the debt).
    pub fn place_exit_order(
        &mut self,
        ctx: &mut TickContext<'_>,
        calculator: &mut dyn PriceCalculator,
    ) -> Result<(), TradingError> {
        self.ensure_resumed(ctx)?;
        self.expect_state("place_exit_order", StrategyState::NeedExit)?;
        if self.exit_order.is_some() {
            return Err(StrategyError::OrderAlreadyHeld.into());
        }
        let enter_type = self
            .enter_order
            .as_ref()
            .ok_or(StrategyError::NoOrderHeld)?
            .enter_type();

        let price = calculator.calculate(&ctx.indicators(), enter_type);
        calculator.log_calculation(price, enter_type);
        if !price.is_finite() || price <= 0.0 {
            warn!(market = %self.market, price, "unusable exit price, skipping tick");
            return Ok(());
        }
        // A ratchet survives a replaced stop whose resubmit failed.
        let price = match self.ratchet.as_ref() {
            Some(ratchet) => ratchet.clone().apply(price),
            None => price,
        };

        let order = self.submit_exit(ctx, enter_type, price)?;
        info!(market = %self.market, id = %order.id, amount = order.quantity, price, "exit order placed");
        self.ratchet
            .get_or_insert_with(|| StopRatchet::new(enter_type))
            .apply(price);
        self.exit_order = Some(order);
        self.transition(StrategyState::WaitForExit);
        Ok(())
    }

    /// Watch the running exit order. On fill the realized trade goes to
    /// `on_trade_closed` and the cycle restarts. While open, a market that
    /// gapped through the stop forces a market order after a few ticks;
    /// otherwise the stop is moved whenever the calculator offers a strictly
    /// better one.
    pub fn track_running_exit_order(
        &mut self,
        ctx: &mut TickContext<'_>,
        calculator: &mut dyn PriceCalculator,
        on_trade_closed: &mut dyn FnMut(&ClosedTrade),
    ) -> Result<(), TradingError> {
        self.ensure_resumed(ctx)?;
        self.expect_state("track_running_exit_order", StrategyState::WaitForExit)?;
        let exit = self.exit_order.clone().ok_or(StrategyError::NoOrderHeld)?;
        let entry = self.enter_order.clone().ok_or(StrategyError::NoOrderHeld)?;
        let enter_type = entry.enter_type();

        let open = ctx
            .open_orders
            .find(ctx.tick, ctx.exchange, &self.market, &exit.id)?;
        if open.is_none() {
            let trade = self.closed_trade(ctx, &entry, &exit)?;
            let index = ctx.index()?;
            ctx.ledgers.get_mut(self.ledger)?.record_exit(index)?;
            info!(
                market = %self.market,
                %enter_type,
                entry = trade.entry_price,
                exit = trade.exit_price,
                gain = trade.gain,
                "trade closed"
            );
            on_trade_closed(&trade);
            self.enter_order = None;
            self.exit_order = None;
            self.ratchet = None;
            self.transition(StrategyState::NeedEnter);
            return Ok(());
        }

        let ticker = *ctx.prices.ticker().ok_or(StrategyError::NoMarketData)?;
        let market_price = MarketPrice::exit().calculate(&ctx.indicators(), enter_type);
        let crossed = match enter_type {
            MarketEnterType::LongPosition => ticker.bid < exit.price,
            MarketEnterType::ShortPosition => ticker.ask > exit.price,
        };

        if crossed {
            let exit = exit.with_not_executed_incremented();
            if exit.not_executed_count <= self.limits.exit_crossed {
                debug!(id = %exit.id, count = exit.not_executed_count, "market past exit order");
                self.exit_order = Some(exit);
                return Ok(());
            }
            if !self.cancel(ctx, &exit.id)? {
                self.exit_order = Some(exit);
                return Ok(());
            }
            self.ratchet
                .get_or_insert_with(|| StopRatchet::new(enter_type))
                .reset(market_price);
            let replacement = self.resubmit_exit(ctx, enter_type, market_price)?;
            info!(market = %self.market, id = %replacement.id, price = market_price, "exit forced at market");
            return Ok(());
        }

        let stop = calculator.calculate(&ctx.indicators(), enter_type);
        calculator.log_calculation(stop, enter_type);
        let ratchet = self
            .ratchet
            .get_or_insert_with(|| StopRatchet::with_level(enter_type, exit.price));
        if !ratchet.improves(stop) {
            debug!(id = %exit.id, stop, current = exit.price, "stop not improved");
            return Ok(());
        }
        if !self.cancel(ctx, &exit.id)? {
            return Ok(());
        }
        if let Some(ratchet) = self.ratchet.as_mut() {
            ratchet.apply(stop);
        }
        let replacement = self.resubmit_exit(ctx, enter_type, stop)?;
        info!(market = %self.market, id = %replacement.id, from = exit.price, to = stop, "stop raised");
        Ok(())
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn expect_state(
        &self,
        operation: &'static str,
        expected: StrategyState,
    ) -> Result<(), StrategyError> {
        if self.state != expected {
            return Err(StrategyError::WrongState {
                operation,
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn transition(&mut self, to: StrategyState) {
        info!(market = %self.market, from = %self.state, to = %to, "state transition");
        self.state = to;
    }

    fn register_entry(
        &self,
        ctx: &mut TickContext<'_>,
        enter_type: MarketEnterType,
    ) -> Result<(), TradingError> {
        let index = ctx.index()?;
        ctx.ledgers
            .get_mut(self.ledger)?
            .record_entry(index, enter_type)?;
        Ok(())
    }

    /// Cancel `id`; a refusal or error is logged and reported as `false`.
    fn cancel(&self, ctx: &mut TickContext<'_>, id: &OrderId) -> Result<bool, TradingError> {
        let cancelled = match ctx.exchange.cancel_order(id, &self.market) {
            Ok(cancelled) => cancelled,
            Err(err) => {
                warn!(market = %self.market, %id, %err, "cancel failed, retrying next tick");
                return Ok(false);
            }
        };
        if !cancelled {
            warn!(market = %self.market, %id, "cancel refused, order may be filled");
        }
        ctx.open_orders.invalidate(ctx.tick);
        Ok(cancelled)
    }

    fn submit_exit(
        &self,
        ctx: &mut TickContext<'_>,
        enter_type: MarketEnterType,
        price: f64,
    ) -> Result<PlacedOrder, TradingError> {
        let amount = match enter_type {
            MarketEnterType::LongPosition => ctx.exchange.available_balance(&self.market.base)?,
            MarketEnterType::ShortPosition => 0.0,
        };
        let order_type = enter_type.exit_order_type();
        let id = ctx
            .exchange
            .create_order(&self.market, order_type, amount, price)?;
        ctx.open_orders.invalidate(ctx.tick);
        Ok(PlacedOrder::new(id, order_type, amount, price))
    }

    /// Replace a cancelled exit order. The tracker drops back to `NeedExit`
    /// first so a failed submit is retried by `place_exit_order` instead of
    /// the vanished order being read as a fill.
    fn resubmit_exit(
        &mut self,
        ctx: &mut TickContext<'_>,
        enter_type: MarketEnterType,
        price: f64,
    ) -> Result<PlacedOrder, TradingError> {
        self.exit_order = None;
        self.state = StrategyState::NeedExit;
        debug!(market = %self.market, price, "exit order cancelled, resubmitting");
        let replacement = self.submit_exit(ctx, enter_type, price)?;
        self.exit_order = Some(replacement.clone());
        self.state = StrategyState::WaitForExit;
        Ok(replacement)
    }

    fn closed_trade(
        &self,
        ctx: &TickContext<'_>,
        entry: &PlacedOrder,
        exit: &PlacedOrder,
    ) -> Result<ClosedTrade, TradingError> {
        let buy_fee = ctx.exchange.buy_fee_percentage(&self.market)?;
        let sell_fee = ctx.exchange.sell_fee_percentage(&self.market)?;
        let quantity = entry.quantity;
        let enter_type = entry.enter_type();
        let gain = match enter_type {
            MarketEnterType::LongPosition => {
                quantity * exit.price * (1.0 - sell_fee) - quantity * entry.price * (1.0 + buy_fee)
            }
            MarketEnterType::ShortPosition => {
                quantity * entry.price * (1.0 - sell_fee) - quantity * exit.price * (1.0 + buy_fee)
            }
        };
        Ok(ClosedTrade {
            enter_type,
            entry_price: entry.price,
            exit_price: exit.price,
            quantity,
            gain,
        })
    }
}

fn adopt(order: &OpenOrder) -> PlacedOrder {
    PlacedOrder::new(
        order.id.clone(),
        order.order_type,
        order.original_quantity,
        order.price,
    )
}
