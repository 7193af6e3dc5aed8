pub mod banking_details;
pub mod books;
pub mod courses;
pub mod events;
pub mod order_items;
pub mod org_memberships;
pub mod orders;
pub mod organizations;
pub mod payments;
pub mod payouts;
pub mod users;
pub mod wallet_transactions;
pub mod wallets;

pub use banking_details as banking_detail_entity;
pub use books as book_entity;
pub use courses as course_entity;
pub use events as event_entity;
pub use order_items as order_item_entity;
pub use org_memberships as org_membership_entity;
pub use orders as order_entity;
pub use organizations as organization_entity;
pub use payments as payment_entity;
pub use payouts as payout_entity;
pub use users as user_entity;
pub use wallet_transactions as wallet_transaction_entity;
pub use wallets as wallet_entity;

pub use order_items::ItemTarget;
pub use org_memberships::MembershipRole;
pub use payouts::PayoutStatus;
pub use wallet_transactions::TransactionType;
pub use wallets::{OwnerKind, WalletOwner};
