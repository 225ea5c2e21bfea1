use once_cell::sync::Lazy;
use regex::Regex;

static UGANDA_MOBILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+?256|0)7\d{8}$").expect("Invalid Ugandan mobile number regex"));

/// Whether `phone` is a Ugandan mobile number, e.g. `0772123456`, `256772123456` or `+256772123456`.
/// Spaces and dashes are ignored.
pub fn is_valid_ugandan_mobile(phone: &str) -> bool {
    UGANDA_MOBILE.is_match(&normalize_phone(phone))
}

/// Strips the separators people commonly type into phone numbers.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| !c.is_whitespace() && *c != '-').collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn valid_numbers() {
        assert!(is_valid_ugandan_mobile("0772123456"));
        assert!(is_valid_ugandan_mobile("256772123456"));
        assert!(is_valid_ugandan_mobile("+256 772 123 456"));
        assert!(is_valid_ugandan_mobile("0701-234-567"));
    }

    #[test]
    fn invalid_numbers() {
        assert!(!is_valid_ugandan_mobile(""));
        assert!(!is_valid_ugandan_mobile("077212345"));
        assert!(!is_valid_ugandan_mobile("07721234567"));
        assert!(!is_valid_ugandan_mobile("0412123456"));
        assert!(!is_valid_ugandan_mobile("+254772123456"));
        assert!(!is_valid_ugandan_mobile("phone"));
    }
}
