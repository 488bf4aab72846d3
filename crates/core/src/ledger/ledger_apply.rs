//! Pure application math for the ledger executor.
//!
//! The storage layer folds a batch of instructions through these functions
//! inside one transaction. Keeping the math here keeps the invariants
//! (cash floor, oversell, weighted-average cost) database-agnostic and
//! unit-testable.

use std::collections::HashMap;

use rust_decimal::Decimal;

use super::ledger_errors::LedgerError;
use super::ledger_model::{Position, TradeInstruction};
use crate::trades::TradeSide;

/// In-memory cash + positions state a batch is folded through.
#[derive(Debug, Clone)]
pub struct LedgerState {
    pub cash_balance: Decimal,
    /// Positions keyed by symbol.
    pub positions: HashMap<String, Position>,
}

impl LedgerState {
    pub fn new(cash_balance: Decimal, positions: Vec<Position>) -> Self {
        let positions = positions
            .into_iter()
            .map(|p| (p.symbol.clone(), p))
            .collect();
        Self {
            cash_balance,
            positions,
        }
    }
}

/// Applies a single instruction to the state, enforcing the ledger invariants.
///
/// - BUY: rejects when notional exceeds cash; creates the position or blends
///   the average price as `(old_qty * old_avg + new_qty * price) / total_qty`.
/// - SELL: rejects a missing position or an oversell; credits cash, keeps the
///   average price, and removes the position when quantity reaches exactly zero.
///
/// The state is only mutated on success.
pub fn apply_instruction(
    state: &mut LedgerState,
    portfolio_id: &str,
    instruction: &TradeInstruction,
) -> Result<(), LedgerError> {
    if instruction.quantity <= Decimal::ZERO {
        return Err(LedgerError::InvalidQuantity(instruction.quantity));
    }
    if instruction.price <= Decimal::ZERO {
        return Err(LedgerError::InvalidPrice(instruction.price));
    }

    let notional = instruction.notional();

    match instruction.side {
        TradeSide::Buy => {
            if notional > state.cash_balance {
                return Err(LedgerError::InsufficientCash);
            }
            state.cash_balance -= notional;
            match state.positions.get_mut(&instruction.symbol) {
                Some(position) => {
                    let old_cost = position.quantity * position.average_price;
                    let new_quantity = position.quantity + instruction.quantity;
                    position.average_price = (old_cost + notional) / new_quantity;
                    position.quantity = new_quantity;
                }
                None => {
                    state.positions.insert(
                        instruction.symbol.clone(),
                        Position {
                            portfolio_id: portfolio_id.to_string(),
                            symbol: instruction.symbol.clone(),
                            quantity: instruction.quantity,
                            average_price: instruction.price,
                        },
                    );
                }
            }
        }
        TradeSide::Sell => {
            let position = state
                .positions
                .get_mut(&instruction.symbol)
                .ok_or(LedgerError::NoPosition)?;
            if instruction.quantity > position.quantity {
                return Err(LedgerError::Oversell);
            }
            state.cash_balance += notional;
            position.quantity -= instruction.quantity;
            if position.quantity.is_zero() {
                state.positions.remove(&instruction.symbol);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn buy(symbol: &str, quantity: Decimal, price: Decimal) -> TradeInstruction {
        TradeInstruction {
            symbol: symbol.to_string(),
            side: TradeSide::Buy,
            quantity,
            price,
        }
    }

    fn sell(symbol: &str, quantity: Decimal, price: Decimal) -> TradeInstruction {
        TradeInstruction {
            symbol: symbol.to_string(),
            side: TradeSide::Sell,
            quantity,
            price,
        }
    }

    fn state(cash: Decimal) -> LedgerState {
        LedgerState::new(cash, Vec::new())
    }

    #[test]
    fn buy_creates_position_and_debits_cash() {
        let mut s = state(dec!(10000));
        apply_instruction(&mut s, "p1", &buy("AAPL", dec!(10), dec!(100))).unwrap();

        assert_eq!(s.cash_balance, dec!(9000));
        let position = &s.positions["AAPL"];
        assert_eq!(position.quantity, dec!(10));
        assert_eq!(position.average_price, dec!(100));
    }

    #[test]
    fn buy_blends_weighted_average_price() {
        let mut s = state(dec!(10000));
        apply_instruction(&mut s, "p1", &buy("AAPL", dec!(10), dec!(100))).unwrap();
        apply_instruction(&mut s, "p1", &buy("AAPL", dec!(5), dec!(110))).unwrap();

        let position = &s.positions["AAPL"];
        assert_eq!(position.quantity, dec!(15));
        // (10*100 + 5*110) / 15
        assert_eq!(position.average_price.round_dp(2), dec!(103.33));
    }

    #[test]
    fn sell_keeps_average_price() {
        let mut s = state(dec!(10000));
        apply_instruction(&mut s, "p1", &buy("MSFT", dec!(10), dec!(120))).unwrap();
        apply_instruction(&mut s, "p1", &sell("MSFT", dec!(4), dec!(130))).unwrap();

        let position = &s.positions["MSFT"];
        assert_eq!(position.quantity, dec!(6));
        assert_eq!(position.average_price, dec!(120));
        // 10000 - 1200 + 520
        assert_eq!(s.cash_balance, dec!(9320));
    }

    #[test]
    fn sell_to_zero_removes_position() {
        let mut s = state(dec!(5000));
        apply_instruction(&mut s, "p1", &buy("NVDA", dec!(3), dec!(500))).unwrap();
        apply_instruction(&mut s, "p1", &sell("NVDA", dec!(3), dec!(550))).unwrap();

        assert!(!s.positions.contains_key("NVDA"));
        assert_eq!(s.cash_balance, dec!(5150));
    }

    #[test]
    fn oversell_is_rejected_and_state_unchanged() {
        let mut s = state(dec!(5000));
        apply_instruction(&mut s, "p1", &buy("AMD", dec!(5), dec!(100))).unwrap();

        let err = apply_instruction(&mut s, "p1", &sell("AMD", dec!(6), dec!(100))).unwrap_err();
        assert_eq!(err, LedgerError::Oversell);
        assert_eq!(s.positions["AMD"].quantity, dec!(5));
        assert_eq!(s.cash_balance, dec!(4500));
    }

    #[test]
    fn sell_without_position_is_rejected() {
        let mut s = state(dec!(5000));
        let err = apply_instruction(&mut s, "p1", &sell("TSLA", dec!(1), dec!(200))).unwrap_err();
        assert_eq!(err, LedgerError::NoPosition);
    }

    #[test]
    fn buy_exceeding_cash_is_rejected_without_partial_debit() {
        let mut s = state(dec!(999));
        let err = apply_instruction(&mut s, "p1", &buy("GOOG", dec!(10), dec!(100))).unwrap_err();
        assert_eq!(err, LedgerError::InsufficientCash);
        assert_eq!(s.cash_balance, dec!(999));
        assert!(s.positions.is_empty());
    }

    #[test]
    fn buy_spending_exact_cash_is_allowed() {
        let mut s = state(dec!(1000));
        apply_instruction(&mut s, "p1", &buy("GOOG", dec!(10), dec!(100))).unwrap();
        assert_eq!(s.cash_balance, dec!(0));
    }

    #[test]
    fn non_positive_quantity_and_price_are_rejected() {
        let mut s = state(dec!(1000));
        assert!(matches!(
            apply_instruction(&mut s, "p1", &buy("AAPL", dec!(0), dec!(10))),
            Err(LedgerError::InvalidQuantity(_))
        ));
        assert!(matches!(
            apply_instruction(&mut s, "p1", &buy("AAPL", dec!(1), dec!(-5))),
            Err(LedgerError::InvalidPrice(_))
        ));
    }
}
