pub mod admin;
pub mod payment;
pub mod wallet;
pub mod webhook;

pub use admin::admin_config;
pub use payment::payment_config;
pub use wallet::wallet_config;
pub use webhook::webhook_config;
