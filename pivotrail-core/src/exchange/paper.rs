//! In-memory exchange for tests and replays.
//!
//! Single market. Limit orders fill at their own price once the ticker passes
//! them:
//!
//! | Order | Fills when |
//! |---|---|
//! | Buy | `ask <= price` |
//! | ShortEnter | `bid >= price` |
//! | Sell (stop-limit) | `price * (1 - tolerance) <= bid <= price` |
//! | ShortExit (stop-limit) | `price <= ask <= price * (1 + tolerance)` |
//!
//! A stop-limit order the market gaps through stays open. Funds for buys and
//! sells are locked on submission and released on cancel. Short exits carry
//! no quantity and cover the whole short debt.

use super::{Exchange, ExchangeError, Ticker};
use crate::domain::{Market, OpenOrder, OrderId, OrderType};
use std::cell::RefCell;
use std::collections::HashMap;

/// Band below (sell) or above (short exit) the stop price in which it still fills.
pub const DEFAULT_STOP_LIMIT_TOLERANCE: f64 = 0.005;

const DUST: f64 = 1e-12;

/// One (partial) execution.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperFill {
    pub order_id: OrderId,
    pub order_type: OrderType,
    pub quantity: f64,
    pub price: f64,
}

#[derive(Debug)]
struct PaperState {
    ticker: Option<Ticker>,
    balances: HashMap<String, f64>,
    orders: Vec<OpenOrder>,
    next_id: u64,
    short_debt: f64,
    fills: Vec<PaperFill>,
    partial_fill: Option<f64>,
    failing_cancels: u32,
    failing_calls: u32,
    failing_after_cancel: u32,
}

#[derive(Debug)]
pub struct PaperExchange {
    market: Market,
    buy_fee: f64,
    sell_fee: f64,
    minimum_order_volume: f64,
    stop_limit_tolerance: f64,
    state: RefCell<PaperState>,
}

impl PaperExchange {
    /// `fee` is a fraction applied to both sides.
    pub fn new(market: Market, fee: f64, minimum_order_volume: f64) -> Self {
        Self {
            market,
            buy_fee: fee,
            sell_fee: fee,
            minimum_order_volume,
            stop_limit_tolerance: DEFAULT_STOP_LIMIT_TOLERANCE,
            state: RefCell::new(PaperState {
                ticker: None,
                balances: HashMap::new(),
                orders: Vec::new(),
                next_id: 1,
                short_debt: 0.0,
                fills: Vec::new(),
                partial_fill: None,
                failing_cancels: 0,
                failing_calls: 0,
                failing_after_cancel: 0,
            }),
        }
    }

    pub fn with_balance(self, currency: &str, amount: f64) -> Self {
        self.set_balance(currency, amount);
        self
    }

    pub fn with_stop_limit_tolerance(mut self, tolerance: f64) -> Self {
        self.stop_limit_tolerance = tolerance;
        self
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn set_balance(&self, currency: &str, amount: f64) {
        self.state
            .borrow_mut()
            .balances
            .insert(currency.to_string(), amount);
    }

    pub fn balance(&self, currency: &str) -> f64 {
        self.state
            .borrow()
            .balances
            .get(currency)
            .copied()
            .unwrap_or(0.0)
    }

    /// Publish a new ticker and execute every order it reaches.
    pub fn set_ticker(&self, ticker: Ticker) {
        let mut state = self.state.borrow_mut();
        state.ticker = Some(ticker);
        let orders = std::mem::take(&mut state.orders);
        let mut still_open = Vec::with_capacity(orders.len());
        for mut order in orders {
            if !self.reaches(&order, &ticker) {
                still_open.push(order);
                continue;
            }
            let quantity = match (order.order_type, state.partial_fill) {
                (OrderType::ShortExit, _) | (_, None) => order.quantity,
                (_, Some(fraction)) => order.quantity * fraction,
            };
            self.settle(&mut state, &order, quantity);
            order.quantity -= quantity;
            if order.order_type != OrderType::ShortExit && order.quantity > DUST {
                still_open.push(order);
            }
        }
        state.orders = still_open;
    }

    /// Fill only this fraction of an order's remainder per matching ticker.
    pub fn set_partial_fill(&self, fraction: Option<f64>) {
        self.state.borrow_mut().partial_fill = fraction;
    }

    /// The next `count` cancels answer `Ok(false)` and leave the order open.
    pub fn fail_next_cancels(&self, count: u32) {
        self.state.borrow_mut().failing_cancels = count;
    }

    /// The next `count` calls of any kind fail with a network error.
    pub fn fail_next_calls(&self, count: u32) {
        self.state.borrow_mut().failing_calls = count;
    }

    /// Once the next cancel succeeds, the `count` calls after it fail with a
    /// network error.
    pub fn fail_calls_after_cancel(&self, count: u32) {
        self.state.borrow_mut().failing_after_cancel = count;
    }

    /// Put an order on the book without locking funds, as if left over
    /// from a previous run.
    pub fn insert_open_order(&self, order_type: OrderType, quantity: f64, price: f64) -> OrderId {
        let mut state = self.state.borrow_mut();
        let id = OrderId::from(state.next_id);
        state.next_id += 1;
        state.orders.push(OpenOrder {
            id: id.clone(),
            order_type,
            price,
            quantity,
            original_quantity: quantity,
        });
        id
    }

    pub fn fills(&self) -> Vec<PaperFill> {
        self.state.borrow().fills.clone()
    }

    pub fn open_order_count(&self) -> usize {
        self.state.borrow().orders.len()
    }

    pub fn short_debt(&self) -> f64 {
        self.state.borrow().short_debt
    }

    fn reaches(&self, order: &OpenOrder, ticker: &Ticker) -> bool {
        let tol = self.stop_limit_tolerance;
        match order.order_type {
            OrderType::Buy => ticker.ask <= order.price,
            OrderType::ShortEnter => ticker.bid >= order.price,
            OrderType::Sell => ticker.bid <= order.price && ticker.bid >= order.price * (1.0 - tol),
            OrderType::ShortExit => {
                ticker.ask >= order.price && ticker.ask <= order.price * (1.0 + tol)
            }
        }
    }

    fn settle(&self, state: &mut PaperState, order: &OpenOrder, quantity: f64) {
        let base = self.market.base.as_str();
        let counter = self.market.counter.as_str();
        let filled = match order.order_type {
            OrderType::Buy => {
                credit(state, base, quantity);
                quantity
            }
            OrderType::Sell => {
                credit(state, counter, quantity * order.price * (1.0 - self.sell_fee));
                quantity
            }
            OrderType::ShortEnter => {
                credit(state, counter, quantity * order.price * (1.0 - self.sell_fee));
                state.short_debt += quantity;
                quantity
            }
            OrderType::ShortExit => {
                let debt = state.short_debt;
                credit(state, counter, -debt * order.price * (1.0 + self.buy_fee));
                state.short_debt = 0.0;
                debt
            }
        };
        tracing::debug!(
            id = %order.id,
            order_type = %order.order_type,
            quantity = filled,
            price = order.price,
            "paper fill"
        );
        state.fills.push(PaperFill {
            order_id: order.id.clone(),
            order_type: order.order_type,
            quantity: filled,
            price: order.price,
        });
    }

    fn release(&self, state: &mut PaperState, order: &OpenOrder) {
        match order.order_type {
            OrderType::Buy => {
                let locked = order.quantity * order.price * (1.0 + self.buy_fee);
                credit(state, &self.market.counter, locked);
            }
            OrderType::Sell => credit(state, &self.market.base, order.quantity),
            OrderType::ShortEnter | OrderType::ShortExit => {}
        }
    }

    fn call(&self) -> Result<(), ExchangeError> {
        let mut state = self.state.borrow_mut();
        if state.failing_calls > 0 {
            state.failing_calls -= 1;
            return Err(ExchangeError::Network("simulated connection reset".into()));
        }
        Ok(())
    }

    fn check_market(&self, market: &Market) -> Result<(), ExchangeError> {
        if market.id != self.market.id {
            return Err(ExchangeError::TradingApi(format!("unknown market {market}")));
        }
        Ok(())
    }
}

fn credit(state: &mut PaperState, currency: &str, amount: f64) {
    *state.balances.entry(currency.to_string()).or_insert(0.0) += amount;
}

impl Exchange for PaperExchange {
    fn ticker(&self, market: &Market) -> Result<Ticker, ExchangeError> {
        self.call()?;
        self.check_market(market)?;
        self.state
            .borrow()
            .ticker
            .ok_or_else(|| ExchangeError::Network("no ticker published yet".into()))
    }

    fn open_orders(&self, market: &Market) -> Result<Vec<OpenOrder>, ExchangeError> {
        self.call()?;
        self.check_market(market)?;
        Ok(self.state.borrow().orders.clone())
    }

    fn create_order(
        &self,
        market: &Market,
        order_type: OrderType,
        quantity: f64,
        price: f64,
    ) -> Result<OrderId, ExchangeError> {
        self.call()?;
        self.check_market(market)?;
        if !price.is_finite() || price <= 0.0 {
            return Err(ExchangeError::TradingApi(format!("invalid price {price}")));
        }
        if order_type != OrderType::ShortExit && quantity < self.minimum_order_volume {
            return Err(ExchangeError::TradingApi(format!(
                "volume {quantity} below minimum {}",
                self.minimum_order_volume
            )));
        }

        let mut state = self.state.borrow_mut();
        let balance = |state: &PaperState, currency: &str| {
            state.balances.get(currency).copied().unwrap_or(0.0)
        };
        match order_type {
            OrderType::Buy => {
                let cost = quantity * price * (1.0 + self.buy_fee);
                if cost > balance(&*state, &self.market.counter) + DUST {
                    return Err(ExchangeError::TradingApi("insufficient funds".into()));
                }
                credit(&mut state, &self.market.counter, -cost);
            }
            OrderType::Sell => {
                if quantity > balance(&*state, &self.market.base) + DUST {
                    return Err(ExchangeError::TradingApi("insufficient funds".into()));
                }
                credit(&mut state, &self.market.base, -quantity);
            }
            OrderType::ShortEnter | OrderType::ShortExit => {}
        }

        let id = OrderId::from(state.next_id);
        state.next_id += 1;
        state.orders.push(OpenOrder {
            id: id.clone(),
            order_type,
            price,
            quantity,
            original_quantity: quantity,
        });
        Ok(id)
    }

    fn cancel_order(&self, id: &OrderId, market: &Market) -> Result<bool, ExchangeError> {
        self.call()?;
        self.check_market(market)?;
        let mut state = self.state.borrow_mut();
        if state.failing_cancels > 0 {
            state.failing_cancels -= 1;
            return Ok(false);
        }
        let Some(pos) = state.orders.iter().position(|o| &o.id == id) else {
            return Ok(false);
        };
        let order = state.orders.remove(pos);
        self.release(&mut state, &order);
        let armed = std::mem::take(&mut state.failing_after_cancel);
        state.failing_calls += armed;
        Ok(true)
    }

    fn available_balance(&self, currency: &str) -> Result<f64, ExchangeError> {
        self.call()?;
        Ok(self.balance(currency))
    }

    fn minimum_order_volume(&self, market: &Market) -> Result<f64, ExchangeError> {
        self.call()?;
        self.check_market(market)?;
        Ok(self.minimum_order_volume)
    }

    fn buy_fee_percentage(&self, market: &Market) -> Result<f64, ExchangeError> {
        self.call()?;
        self.check_market(market)?;
        Ok(self.buy_fee)
    }

    fn sell_fee_percentage(&self, market: &Market) -> Result<f64, ExchangeError> {
        self.call()?;
        self.check_market(market)?;
        Ok(self.sell_fee)
    }
}
