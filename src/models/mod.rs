pub mod common;
pub mod pagination;
pub mod payout;
pub mod settlement;
pub mod wallet;

pub use common::*;
pub use pagination::*;
pub use payout::*;
pub use settlement::*;
pub use wallet::*;
