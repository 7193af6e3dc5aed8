pub mod account;
pub mod code_generator;
pub mod jwt;

pub use account::{mask_account_number, recipient_type_for_bank};
pub use code_generator::{generate_payout_reference, generate_transaction_reference};
pub use jwt::*;
