//! Huddle Billing - Subscription Lifecycle and Reconciliation Core
//!
//! This crate implements the billing core of the Huddle community platform:
//! the gateway subscription state machine, the trial/suspension policy
//! engine, and the reconciliation service that detects and repairs drift
//! between a community's billing state and its gateway-backed subscription
//! records.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
