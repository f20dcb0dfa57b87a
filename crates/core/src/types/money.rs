//! Monetary amounts using decimal arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places every stored or displayed amount is rounded to.
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to cents (half away from zero) with a fixed scale of 2.
///
/// ```
/// use reservio_core::round_money;
/// use rust_decimal::Decimal;
///
/// let rounded = round_money(Decimal::new(12_345, 3)); // 12.345
/// assert_eq!(rounded.to_string(), "12.35");
/// assert_eq!(round_money(Decimal::from(8)).to_string(), "8.00");
/// ```
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// ISO 4217 currency codes supported for prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Format an amount for display, e.g. `$19.99`.
    #[must_use]
    pub fn format(self, amount: Decimal) -> String {
        format!("{}{}", self.symbol(), round_money(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money_midpoint() {
        assert_eq!(round_money(Decimal::new(5, 3)).to_string(), "0.01");
        assert_eq!(round_money(Decimal::new(-5, 3)).to_string(), "-0.01");
        assert_eq!(round_money(Decimal::new(4, 3)).to_string(), "0.00");
    }

    #[test]
    fn test_currency_format() {
        assert_eq!(CurrencyCode::GBP.format(Decimal::new(1999, 2)), "£19.99");
        assert_eq!(CurrencyCode::default().format(Decimal::from(5)), "$5.00");
    }
}
