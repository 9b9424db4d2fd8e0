//! ExchangeDesk Common Types
//!
//! Shared types used across the ExchangeDesk workspace: entity identifiers
//! and the currency/money primitives the pricing engine is expressed in.

pub mod identifiers;
pub mod monetary;

pub use identifiers::*;
pub use monetary::*;
