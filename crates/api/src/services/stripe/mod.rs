//! Stripe integration for in-app card payments.
//!
//! This module provides:
//! - [`StripeClient`] for customers, ephemeral keys, and payment intents
//! - Webhook signature verification (`Stripe-Signature` header)
//!
//! # Flow
//!
//! 1. The app asks for a payment intent with an amount in minor units
//! 2. A gateway customer is reused or created for registered users
//! 3. An ephemeral key lets the mobile payment sheet act for that customer
//! 4. Payment outcomes arrive later through the signed webhook

mod client;
mod error;
mod types;

pub use client::StripeClient;
pub use error::StripeError;
pub use types::{
    Customer, EphemeralKey, PaymentIntent, PaymentIntentRequest, WebhookEvent, WebhookEventData,
};
