//! Application layer - use-case handlers.
//!
//! Each handler wires domain logic to the ports it needs, in
//! command/handler style.

pub mod handlers;
