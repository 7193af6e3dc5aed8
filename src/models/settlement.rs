use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// Guard hit: the order was settled before, nothing was posted
    AlreadyDistributed,
    /// Payment not confirmed yet, nothing was posted
    NotPaid,
    Distributed {
        items_settled: usize,
        items_skipped: usize,
        /// total credited to sellers, minor units
        seller_total: i64,
        /// total kept by the platform, minor units
        commission_total: i64,
    },
}
