//! Pure holding and portfolio arithmetic.
//!
//! All money is `BigDecimal`; nothing here touches floats, I/O or the clock.

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, Zero};
use chrono::{Months, NaiveDate};

use crate::models::{AccountSummary, DividendSummary, HoldingWithStock};

pub const PERCENT_SCALE: i64 = 4;
pub const PRICE_SCALE: i64 = 2;

/// Rounds to `scale` decimal places, ties away from zero.
pub fn round_half_up(value: &BigDecimal, scale: i64) -> BigDecimal {
    let half = BigDecimal::new(BigInt::from(5), scale + 1);
    let magnitude = (value.abs() + half).with_scale(scale);
    if value < &BigDecimal::zero() {
        -magnitude
    } else {
        magnitude
    }
}

/// `numerator / denominator * 100`, or zero when the denominator is not positive.
pub fn percent_of(numerator: &BigDecimal, denominator: &BigDecimal) -> BigDecimal {
    if denominator <= &BigDecimal::zero() {
        return BigDecimal::zero().with_scale(PERCENT_SCALE);
    }
    let ratio = numerator / denominator * BigDecimal::from(100_i64);
    round_half_up(&ratio, PERCENT_SCALE)
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoldingValuation {
    pub current_value: BigDecimal,
    pub profit_loss: BigDecimal,
    pub profit_loss_percent: BigDecimal,
}

pub fn value_holding(
    quantity: i32,
    total_invested: &BigDecimal,
    current_price: &BigDecimal,
) -> HoldingValuation {
    let current_value = current_price * BigDecimal::from(i64::from(quantity));
    let profit_loss = &current_value - total_invested;
    let profit_loss_percent = percent_of(&profit_loss, total_invested);

    HoldingValuation {
        current_value,
        profit_loss,
        profit_loss_percent,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedPosition {
    pub quantity: i32,
    pub average_buy_price: BigDecimal,
    pub total_invested: BigDecimal,
}

/// Folds one buy into an existing (possibly empty) position.
///
/// Callers must ensure `existing_quantity + new_quantity` fits in an `i32` and is positive.
pub fn merge_buy(
    existing_quantity: i32,
    existing_total_invested: &BigDecimal,
    new_quantity: i32,
    new_buy_price: &BigDecimal,
) -> MergedPosition {
    let total_invested =
        existing_total_invested + new_buy_price * BigDecimal::from(i64::from(new_quantity));
    let quantity = existing_quantity + new_quantity;
    let average = &total_invested / BigDecimal::from(i64::from(quantity));

    MergedPosition {
        quantity,
        average_buy_price: round_half_up(&average, PRICE_SCALE),
        total_invested,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioTotals {
    pub total_invested: BigDecimal,
    pub total_current_value: BigDecimal,
    pub total_profit_loss: BigDecimal,
    pub total_profit_loss_percent: BigDecimal,
    pub average_dividend_yield: BigDecimal,
}

/// Sums invested and current value across holdings.
///
/// The profit/loss percentage is taken over the totals, not averaged per holding. The
/// dividend yield is the mean over holdings whose stock actually reports a yield.
pub fn aggregate_portfolio(holdings: &[HoldingWithStock]) -> PortfolioTotals {
    let mut total_invested = BigDecimal::zero();
    let mut total_current_value = BigDecimal::zero();
    let mut yield_sum = BigDecimal::zero();
    let mut yield_count: i64 = 0;

    for line in holdings {
        total_invested += &line.holding.total_invested;
        if let Some(value) = &line.holding.current_value {
            total_current_value += value;
        }
        if let Some(dividend_yield) = &line.stock.dividend_yield {
            yield_sum += dividend_yield;
            yield_count += 1;
        }
    }

    let total_profit_loss = &total_current_value - &total_invested;
    let total_profit_loss_percent = percent_of(&total_profit_loss, &total_invested);
    let average_dividend_yield = if yield_count > 0 {
        round_half_up(&(yield_sum / BigDecimal::from(yield_count)), PRICE_SCALE)
    } else {
        BigDecimal::zero().with_scale(PRICE_SCALE)
    };

    PortfolioTotals {
        total_invested,
        total_current_value,
        total_profit_loss,
        total_profit_loss_percent,
        average_dividend_yield,
    }
}

pub fn summarize_account(
    current_value: BigDecimal,
    total_deposits: BigDecimal,
    daily_profit_loss: BigDecimal,
) -> AccountSummary {
    let total_profit_loss = &current_value - &total_deposits;
    let total_profit_loss_percentage = percent_of(&total_profit_loss, &total_deposits);
    let previous_value = &current_value - &daily_profit_loss;
    let daily_profit_loss_percentage = percent_of(&daily_profit_loss, &previous_value);

    AccountSummary {
        current_value,
        total_deposits,
        total_profit_loss,
        total_profit_loss_percentage,
        daily_profit_loss,
        daily_profit_loss_percentage,
    }
}

/// Derives annual dividend, yield and the estimated next payment from raw payouts.
///
/// Payouts dated within the year before `today` make up the annual figure; the next payment
/// is estimated one quarter after the most recent payout seen.
pub fn summarize_dividends(
    payouts: &[(NaiveDate, BigDecimal)],
    current_price: &BigDecimal,
    today: NaiveDate,
) -> DividendSummary {
    if payouts.is_empty() {
        return DividendSummary::default();
    }

    let one_year_ago = today.checked_sub_months(Months::new(12)).unwrap_or(today);
    let mut annual = BigDecimal::zero();
    let mut latest: Option<NaiveDate> = None;

    for (date, amount) in payouts {
        if *date > one_year_ago {
            annual += amount;
        }
        if latest.map_or(true, |seen| *date > seen) {
            latest = Some(*date);
        }
    }

    let dividend_yield = if current_price > &BigDecimal::zero() {
        Some(percent_of(&annual, current_price))
    } else {
        None
    };

    DividendSummary {
        annual_dividend: Some(annual),
        dividend_yield,
        next_dividend_date: latest.and_then(|date| date.checked_add_months(Months::new(3))),
    }
}

/// Earliest earnings date strictly after `today`.
pub fn next_earnings_date(dates: &[NaiveDate], today: NaiveDate) -> Option<NaiveDate> {
    dates.iter().copied().filter(|date| *date > today).min()
}
