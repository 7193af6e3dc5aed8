/// Masks an account or phone number for display: `0712345689` -> `071****89`.
/// Short numbers are hidden completely.
pub fn mask_account_number(raw: &str) -> String {
    let digits: Vec<char> = raw.trim().chars().collect();
    if digits.len() <= 4 {
        return "****".to_string();
    }
    let head: String = digits[..3].iter().collect();
    let tail: String = digits[digits.len() - 2..].iter().collect();
    format!("{head}****{tail}")
}

/// Paystack recipient type for a bank code; M-Pesa goes through mobile money.
pub fn recipient_type_for_bank(bank_code: &str) -> &'static str {
    if bank_code.eq_ignore_ascii_case("MPESA") {
        "mobile_money"
    } else {
        "nuban"
    }
}
