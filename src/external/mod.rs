pub mod paystack;

pub use paystack::*;
