//! Helpers for working with 256-bit token amounts.

pub mod serialization;
