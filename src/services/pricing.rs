//! Pure order-pricing engine.
//!
//! Every amount is a [`Decimal`]; nothing here touches the database or the
//! payment gateway. Checkout rounds to 2 decimal places only at the
//! persistence boundary, so intermediate math keeps full precision.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::entities::coupon::{self, CouponKind};

/// Orders above this (after discount) ship free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = dec!(5000);
/// Flat shipping fee below the threshold.
pub const SHIPPING_FLAT_FEE: Decimal = dec!(99);
/// GST applied to the discounted subtotal.
pub const TAX_RATE: Decimal = dec!(0.18);

/// Fully-priced order, before rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl Quote {
    /// Round every component to 2 decimal places for persistence and
    /// display. Uses banker's rounding, same as the gateway amount.
    pub fn round_dp2(&self) -> Quote {
        Quote {
            subtotal: self.subtotal.round_dp(2),
            discount: self.discount.round_dp(2),
            shipping: self.shipping.round_dp(2),
            tax: self.tax.round_dp(2),
            total: self.total.round_dp(2),
        }
    }

    /// Gateway amount in minor currency units (paise).
    pub fn amount_minor(&self) -> i64 {
        (self.total * dec!(100)).round().to_i64().unwrap_or(i64::MAX)
    }
}

/// Sum of `price × quantity` over the cart lines.
pub fn subtotal<'a, I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (&'a Decimal, i32)>,
{
    lines
        .into_iter()
        .map(|(price, qty)| *price * Decimal::from(qty))
        .sum()
}

/// Discount a validated coupon yields against `subtotal`.
///
/// Percentage coupons scale with the subtotal and are capped at
/// `max_discount` when set; fixed coupons apply their value verbatim, even
/// when it exceeds the subtotal.
pub fn discount_for(coupon: &coupon::Model, subtotal: Decimal) -> Decimal {
    match coupon.kind {
        CouponKind::Percentage => {
            let discount = subtotal * coupon.value / dec!(100);
            match coupon.max_discount {
                Some(cap) => discount.min(cap),
                None => discount,
            }
        }
        CouponKind::Fixed => coupon.value,
    }
}

/// Price an order: shipping is free above the threshold (strictly greater),
/// tax applies to the discounted subtotal, and
/// `total = subtotal - discount + shipping + tax`.
pub fn price(subtotal: Decimal, discount: Decimal) -> Quote {
    let discounted = subtotal - discount;
    let shipping = if discounted > FREE_SHIPPING_THRESHOLD {
        Decimal::ZERO
    } else {
        SHIPPING_FLAT_FEE
    };
    let tax = discounted * TAX_RATE;
    Quote {
        subtotal,
        discount,
        shipping,
        tax,
        total: discounted + shipping + tax,
    }
}
