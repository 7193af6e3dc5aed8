pub mod ownership;
pub mod payment_service;
pub mod payout_service;
pub mod settlement_service;
pub mod wallet_service;

pub use payment_service::*;
pub use payout_service::*;
pub use settlement_service::*;
pub use wallet_service::WalletService;
