//! Human-readable order numbers of the form `ORD-YYYYMMDD-XXXXXXXX`.
//!
//! The suffix is eight random upper-case alphanumeric characters. Uniqueness is enforced by the database, and the
//! order transaction retries with a fresh suffix if a number is already taken.
use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};

pub const ORDER_NUMBER_PREFIX: &str = "ORD";
const SUFFIX_LEN: usize = 8;

pub fn new_order_number(now: DateTime<Utc>) -> String {
    let suffix = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(|c| char::from(c).to_ascii_uppercase())
        .take(SUFFIX_LEN)
        .collect::<String>();
    format!("{ORDER_NUMBER_PREFIX}-{}-{suffix}", now.format("%Y%m%d"))
}

/// Checks that `s` looks like an order number issued by [`new_order_number`].
pub fn is_valid_order_number(s: &str) -> bool {
    let mut parts = s.split('-');
    let (Some(prefix), Some(date), Some(suffix), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    prefix == ORDER_NUMBER_PREFIX &&
        date.len() == 8 &&
        date.chars().all(|c| c.is_ascii_digit()) &&
        suffix.len() == SUFFIX_LEN &&
        suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn order_number_format() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
        let n = new_order_number(now);
        assert!(n.starts_with("ORD-20240615-"), "{n}");
        assert_eq!(n.len(), 21);
        assert!(is_valid_order_number(&n), "{n}");
        assert_ne!(n, new_order_number(now));
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert!(!is_valid_order_number("ORD-20240615"));
        assert!(!is_valid_order_number("ORD-2024061-ABCDEFGH"));
        assert!(!is_valid_order_number("INV-20240615-ABCDEFGH"));
        assert!(!is_valid_order_number("ORD-20240615-abcdefgh"));
        assert!(!is_valid_order_number("ORD-20240615-ABCDEFGH-1"));
    }
}
