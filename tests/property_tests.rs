//! Property checks over the pricing engine.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use storefront_api::services::pricing::{
    self, FREE_SHIPPING_THRESHOLD, SHIPPING_FLAT_FEE, TAX_RATE,
};

fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

proptest! {
    #[test]
    fn shipping_is_flat_fee_or_free(
        subtotal_cents in 0i64..10_000_000,
        discount_cents in 0i64..1_000_000,
    ) {
        let q = pricing::price(money(subtotal_cents), money(discount_cents));
        prop_assert!(q.shipping == SHIPPING_FLAT_FEE || q.shipping == Decimal::ZERO);
        let discounted = q.subtotal - q.discount;
        if discounted > FREE_SHIPPING_THRESHOLD {
            prop_assert_eq!(q.shipping, Decimal::ZERO);
        } else {
            prop_assert_eq!(q.shipping, SHIPPING_FLAT_FEE);
        }
    }

    #[test]
    fn total_identity(
        subtotal_cents in 0i64..10_000_000,
        discount_cents in 0i64..1_000_000,
    ) {
        let q = pricing::price(money(subtotal_cents), money(discount_cents));
        prop_assert_eq!(q.total, q.subtotal - q.discount + q.shipping + q.tax);
    }

    #[test]
    fn tax_is_exactly_the_rate_on_the_discounted_subtotal(
        subtotal_cents in 0i64..10_000_000,
        discount_cents in 0i64..1_000_000,
    ) {
        let q = pricing::price(money(subtotal_cents), money(discount_cents));
        prop_assert_eq!(q.tax, (q.subtotal - q.discount) * TAX_RATE);
    }

    #[test]
    fn subtotal_is_order_independent(
        prices in proptest::collection::vec((1i64..100_000, 1i32..10), 0..8),
    ) {
        let decimals: Vec<Decimal> = prices.iter().map(|(c, _)| money(*c)).collect();
        let forward: Vec<(&Decimal, i32)> = decimals
            .iter()
            .zip(prices.iter().map(|(_, q)| *q))
            .collect();
        let mut reversed = forward.clone();
        reversed.reverse();
        prop_assert_eq!(pricing::subtotal(forward), pricing::subtotal(reversed));
    }

    #[test]
    fn rounded_quote_has_at_most_two_decimal_places(
        subtotal_cents in 0i64..10_000_000,
        discount_cents in 0i64..1_000_000,
    ) {
        let q = pricing::price(money(subtotal_cents), money(discount_cents)).round_dp2();
        for amount in [q.subtotal, q.discount, q.shipping, q.tax, q.total] {
            prop_assert_eq!(amount, amount.round_dp(2));
        }
    }

    #[test]
    fn amount_minor_matches_rounded_total(
        subtotal_cents in 0i64..10_000_000,
        discount_cents in 0i64..1_000_000,
    ) {
        let q = pricing::price(money(subtotal_cents), money(discount_cents)).round_dp2();
        let minor = Decimal::from(q.amount_minor());
        prop_assert_eq!(minor, q.total * dec!(100));
    }
}
