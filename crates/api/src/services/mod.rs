//! Business services and outbound clients.
//!
//! - [`checkout`] - Order and sale pipelines
//! - [`loyalty`] - Tier cache and visit bookkeeping
//! - [`passwords`] - Argon2id password hashing
//! - [`qr`] - Points voucher QR images
//! - [`expo`] - Push notifications for order updates
//! - [`stripe`] - Payment intents and webhook verification

pub mod checkout;
pub mod expo;
pub mod loyalty;
pub mod passwords;
pub mod qr;
pub mod stripe;
