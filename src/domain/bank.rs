use serde::{Deserialize, Serialize};

/// NUBAN weights applied to the first nine digits of an account number.
const NUBAN_WEIGHTS: [u32; 9] = [3, 7, 3, 3, 7, 3, 3, 7, 3];

/// A Nigerian account number is exactly ten ASCII digits.
pub fn is_valid_account_format(account_number: &str) -> bool {
    account_number.len() == 10 && account_number.chars().all(|c| c.is_ascii_digit())
}

/// Validates the NUBAN check digit: the first nine digits are weighted and
/// summed mod 10, and `(10 - remainder) mod 10` must equal the tenth digit.
pub fn is_valid_nuban(account_number: &str) -> bool {
    if !is_valid_account_format(account_number) {
        return false;
    }
    let digits: Vec<u32> = account_number
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();
    let sum: u32 = digits[..9]
        .iter()
        .zip(NUBAN_WEIGHTS.iter())
        .map(|(d, w)| d * w)
        .sum();
    let check = (10 - (sum % 10)) % 10;
    digits[9] == check
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Bank {
    pub code: String,
    pub name: String,
}

impl Bank {
    fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

/// Built-in directory used when the aggregator's bank list is unreachable.
pub fn fallback_banks() -> Vec<Bank> {
    vec![
        Bank::new("044", "Access Bank"),
        Bank::new("014", "Afribank Nigeria Plc"),
        Bank::new("023", "Citibank Nigeria"),
        Bank::new("050", "Ecobank Nigeria"),
        Bank::new("011", "First Bank of Nigeria"),
        Bank::new("214", "First City Monument Bank"),
        Bank::new("070", "Fidelity Bank"),
        Bank::new("058", "Guaranty Trust Bank"),
        Bank::new("030", "Heritage Bank"),
        Bank::new("082", "Keystone Bank"),
        Bank::new("076", "Polaris Bank"),
        Bank::new("221", "Stanbic IBTC Bank"),
        Bank::new("068", "Standard Chartered Bank"),
        Bank::new("232", "Sterling Bank"),
        Bank::new("033", "United Bank for Africa"),
        Bank::new("032", "Union Bank of Nigeria"),
        Bank::new("035", "Wema Bank"),
        Bank::new("057", "Zenith Bank"),
    ]
}

pub fn find_bank<'a>(banks: &'a [Bank], code: &str) -> Option<&'a Bank> {
    banks.iter().find(|bank| bank.code == code)
}

/// A verified bank account as resolved by the aggregator.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct ResolvedAccount {
    pub account_number: String,
    pub account_name: String,
    pub bank_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_format() {
        assert!(is_valid_account_format("0123456789"));
        assert!(!is_valid_account_format("012345678"));
        assert!(!is_valid_account_format("01234567890"));
        assert!(!is_valid_account_format("01234S6789"));
    }

    #[test]
    fn test_nuban_check_digit() {
        // Weighted sum of 0..=8 is 156, remainder 6, so the check digit is 4.
        assert!(is_valid_nuban("0123456784"));
        assert!(!is_valid_nuban("0123456789"));
    }

    #[test]
    fn test_nuban_rejects_bad_format() {
        assert!(!is_valid_nuban("012345678"));
        assert!(!is_valid_nuban("abcdefghij"));
    }

    #[test]
    fn test_nuban_zero_remainder_wraps_to_zero() {
        // 0000000000: weighted sum 0, remainder 0, check digit (10-0)%10 = 0.
        assert!(is_valid_nuban("0000000000"));
        assert!(!is_valid_nuban("0000000005"));
    }

    #[test]
    fn test_fallback_directory() {
        let banks = fallback_banks();
        assert_eq!(banks.len(), 18);
        assert_eq!(
            find_bank(&banks, "058").map(|b| b.name.as_str()),
            Some("Guaranty Trust Bank")
        );
        assert!(find_bank(&banks, "999").is_none());
    }
}
