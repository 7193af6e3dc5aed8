use uuid::Uuid;

/// Reference for a payout, e.g. `PAYOUT-3F9A1C07BE`. Sent to the transfer
/// provider as the idempotency reference, so it must be unique per payout.
pub fn generate_payout_reference() -> String {
    generate_reference("PAYOUT", 10)
}

/// Reference for a single ledger entry, e.g. `TXN-0B1C2D3E4F5A6B7C`.
pub fn generate_transaction_reference() -> String {
    generate_reference("TXN", 16)
}

fn generate_reference(prefix: &str, len: usize) -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{prefix}-{}", &hex[..len])
}
