//! Encoding of orders into the calldata of the settlement contract.
//!
//! A [`SettlementEncoder`] collects trades and interactions for a batch of
//! orders and is finalized into an [`EncodedSettlement`] once clearing prices
//! are known. A [`SwapEncoder`] does the same for a single order that is
//! settled directly against Balancer pools.

pub mod config;
pub mod contracts;
pub mod error;
pub mod settlement;
pub mod signing;
pub mod swap;
pub mod tokens;
pub mod trade;

pub use {
    config::Config,
    error::{Error, Result},
    settlement::{EncodedSettlement, OrderRefunds, SettlementEncoder},
    signing::{TypedDataSigner, sign_order},
    swap::{EncodedSwap, Swap, SwapEncoder, SwapExecution},
    tokens::TokenRegistry,
    trade::{EncodedTrade, TradeExecution, decode_signature},
};
