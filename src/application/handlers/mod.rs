//! Use-case handlers.

pub mod payment;
