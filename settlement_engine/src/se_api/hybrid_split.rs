//! Splits an order's price between the buyer's credit balance and UGX.
//!
//! The split is a pure calculation. Callers supply the buyer's live balance and persist the result as the payment's
//! [`PaymentData`].
use settlement_common::{Credits, Ugx};

use crate::{db_types::PaymentData, se_api::policy::PricingPolicy};

/// The most credits that may be applied to an order with the given UGX total under the policy's cap.
pub fn max_credits_allowed(total_ugx: Ugx, policy: &PricingPolicy) -> Credits {
    let total = i128::from(total_ugx.value().max(0));
    let pct = i128::from(policy.max_credit_percentage.clamp(0, 100));
    Credits::from(i64::try_from(total * pct / 100).unwrap_or(i64::MAX))
}

/// Works out how many credits to consume and how much UGX remains payable.
///
/// Negative inputs are treated as zero and the result is never negative.
pub fn split_payment(
    total_ugx: Ugx,
    total_credits: Credits,
    available_credits: Credits,
    use_credits: bool,
    policy: &PricingPolicy,
) -> PaymentData {
    let total_ugx = total_ugx.non_negative();
    let total_credits = total_credits.non_negative();
    let available_credits = available_credits.non_negative();
    if !use_credits || available_credits.is_zero() {
        return PaymentData::ugx_only(total_ugx);
    }
    let credits_used = available_credits.min(max_credits_allowed(total_ugx, policy)).min(total_credits);
    let ugx_from_credits = policy.conversion_rate.to_ugx(credits_used);
    let ugx_amount = total_ugx.saturating_sub(ugx_from_credits).non_negative();
    let is_hybrid = credits_used.is_positive() && ugx_amount.is_positive();
    PaymentData { credits_used, ugx_amount, is_hybrid }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;
    use crate::se_api::policy::ConversionRate;

    fn split(total_ugx: i64, total_credits: i64, available: i64, use_credits: bool) -> PaymentData {
        let policy = PricingPolicy::default();
        split_payment(Ugx::from(total_ugx), Credits::from(total_credits), Credits::from(available), use_credits, &policy)
    }

    #[test]
    fn hybrid_split() {
        let data = split(20_000, 150, 100, true);
        assert_eq!(data.credits_used, Credits::from(100));
        assert_eq!(data.ugx_amount, Ugx::from(19_900));
        assert!(data.is_hybrid);
    }

    #[test]
    fn credits_not_requested() {
        let data = split(20_000, 150, 100, false);
        assert_eq!(data, PaymentData::ugx_only(Ugx::from(20_000)));
        let data = split(20_000, 150, 0, true);
        assert_eq!(data, PaymentData::ugx_only(Ugx::from(20_000)));
    }

    #[test]
    fn cap_limits_credits() {
        // 50% of 1000 UGX
        let data = split(1_000, 5_000, 5_000, true);
        assert_eq!(data.credits_used, Credits::from(500));
        assert_eq!(data.ugx_amount, Ugx::from(500));
        assert!(data.is_hybrid);
    }

    #[test]
    fn full_credit_cover() {
        let policy = PricingPolicy::default().with_max_credit_percentage(100);
        let data = split_payment(Ugx::from(1_000), Credits::from(1_000), Credits::from(2_000), true, &policy);
        assert_eq!(data, PaymentData::credits_only(Credits::from(1_000)));
        assert!(!data.is_hybrid);
    }

    #[test]
    fn no_credit_prices_means_no_credits() {
        let data = split(10_000, 0, 500, true);
        assert_eq!(data, PaymentData::ugx_only(Ugx::from(10_000)));
    }

    #[test]
    fn conversion_rate_applies() {
        let rate = ConversionRate::new(10, 1).unwrap();
        let policy = PricingPolicy::default().with_conversion_rate(rate);
        let data = split_payment(Ugx::from(10_000), Credits::from(300), Credits::from(200), true, &policy);
        assert_eq!(data.credits_used, Credits::from(200));
        assert_eq!(data.ugx_amount, Ugx::from(8_000));
        // credits worth more than the remaining total leave nothing to pay
        let rate = ConversionRate::new(100, 1).unwrap();
        let policy = PricingPolicy::default().with_conversion_rate(rate);
        let data = split_payment(Ugx::from(10_000), Credits::from(300), Credits::from(200), true, &policy);
        assert_eq!(data.ugx_amount, Ugx::zero());
        assert!(!data.is_hybrid);
    }

    #[test]
    fn negative_inputs_are_clamped() {
        let data = split(-100, -5, -5, true);
        assert_eq!(data, PaymentData::ugx_only(Ugx::zero()));
        let data = split(i64::MAX, i64::MAX, i64::MAX, true);
        assert!(data.credits_used <= Credits::from(i64::MAX / 2 + 1));
        assert!(!data.ugx_amount.is_negative());
    }

    proptest! {
        #[test]
        fn split_respects_bounds(
            total_ugx in -1_000i64..10_000_000,
            total_credits in -1_000i64..10_000_000,
            available in -1_000i64..10_000_000,
            use_credits in any::<bool>(),
            pct in 0i64..=100,
            num in 1i64..50,
            den in 1i64..50,
        ) {
            let policy = PricingPolicy::default()
                .with_max_credit_percentage(pct)
                .with_conversion_rate(ConversionRate::new(num, den).unwrap());
            let data = split_payment(
                Ugx::from(total_ugx),
                Credits::from(total_credits),
                Credits::from(available),
                use_credits,
                &policy,
            );
            prop_assert!(!data.ugx_amount.is_negative());
            prop_assert!(!data.credits_used.is_negative());
            prop_assert!(data.credits_used <= Credits::from(available.max(0)));
            prop_assert!(data.credits_used <= Credits::from(total_credits.max(0)));
            prop_assert!(data.credits_used.value() <= total_ugx.max(0) * pct / 100);
            prop_assert!(data.ugx_amount <= Ugx::from(total_ugx.max(0)));
            prop_assert_eq!(data.is_hybrid, data.credits_used.is_positive() && data.ugx_amount.is_positive());
            if !use_credits {
                prop_assert!(data.credits_used.is_zero());
            }
        }
    }
}
