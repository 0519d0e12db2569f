//! Domain layer - pure payment verification logic.
//!
//! No I/O happens here; processor and ledger access live behind ports.

pub mod payment;
