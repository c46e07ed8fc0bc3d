//! Entry amount sizing against the exchange minimum and the emergency stop.

/// Base amount bought with `percentage` % of the counter balance at `price`.
pub fn entry_amount(counter_balance: f64, percentage: f64, price: f64) -> f64 {
    counter_balance * percentage / 100.0 / price
}

/// Raise `amount` to `minimum` if needed; `None` when the order would leave
/// less than `emergency_stop` of counter currency after cost and fee.
pub fn sanitize_enter_amount(
    amount: f64,
    minimum: f64,
    price: f64,
    fee: f64,
    counter_balance: f64,
    emergency_stop: f64,
) -> Option<f64> {
    let amount = if amount < minimum { minimum } else { amount };
    let remaining = counter_balance - amount * price * (1.0 + fee);
    if !amount.is_finite() || remaining < emergency_stop {
        return None;
    }
    Some(amount)
}
