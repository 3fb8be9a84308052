use {
    alloy::primitives::Address,
    model::{
        flags::InvalidFlags,
        order::NormalizeError,
        order_uid::InvalidOrderUid,
        signature::{InvalidSignature, UnsupportedSigningScheme},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("executed amount is required for partially fillable orders")]
    MissingExecutedAmount,
    #[error("missing clearing price for token {0}")]
    MissingPrice(Address),
    #[error("domain is missing the settlement contract as its verifying contract")]
    MissingVerifyingContract,
    #[error("no trade has been encoded")]
    TradeNotEncoded,
    #[error("token index {index} is out of bounds for {len} tokens")]
    TokenIndexOutOfBounds { index: usize, len: usize },
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    InvalidOrderUid(#[from] InvalidOrderUid),
    #[error(transparent)]
    InvalidFlags(#[from] InvalidFlags),
    #[error(transparent)]
    UnsupportedSigningScheme(#[from] UnsupportedSigningScheme),
    #[error(transparent)]
    InvalidSignature(#[from] InvalidSignature),
    #[error("signing failed")]
    Signing(#[source] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
