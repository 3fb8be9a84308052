use {
    crate::{
        contracts::GPv2Trade,
        error::{Error, Result},
        tokens::TokenRegistry,
    },
    alloy::primitives::{Address, B256, Bytes, U256},
    model::{
        DomainSeparator,
        flags::{OrderFlags, TradeFlags, decode_signing_scheme},
        order::{NormalizedOrder, Order},
        order_uid::OrderUid,
        signature::{Signature, SigningScheme},
    },
    number::serialization::HexOrDecimalU256,
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
};

/// How much of an order gets executed in a settlement.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TradeExecution {
    /// Sell amount for sell orders, buy amount for buy orders. Required for
    /// partially fillable orders and ignored by the contract otherwise.
    pub executed_amount: Option<U256>,
}

/// An order with its signature in the form the settlement contract consumes
/// it. Tokens are referenced by their index into the settlement's token list.
#[serde_as]
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedTrade {
    pub sell_token_index: usize,
    pub buy_token_index: usize,
    pub receiver: Address,
    #[serde_as(as = "HexOrDecimalU256")]
    pub sell_amount: U256,
    #[serde_as(as = "HexOrDecimalU256")]
    pub buy_amount: U256,
    pub valid_to: u32,
    pub app_data: B256,
    #[serde_as(as = "HexOrDecimalU256")]
    pub fee_amount: U256,
    #[serde_as(as = "HexOrDecimalU256")]
    pub flags: U256,
    #[serde_as(as = "HexOrDecimalU256")]
    pub executed_amount: U256,
    pub signature: Bytes,
}

impl EncodedTrade {
    /// Rebuilds the signed order from the trade and the token list it was
    /// encoded against.
    pub fn decode_order(&self, tokens: &[Address]) -> Result<Order> {
        Ok(self.decode_normalized_order(tokens)?.into())
    }

    fn decode_normalized_order(&self, tokens: &[Address]) -> Result<NormalizedOrder> {
        let token = |index: usize| {
            tokens
                .get(index)
                .copied()
                .ok_or(Error::TokenIndexOutOfBounds {
                    index,
                    len: tokens.len(),
                })
        };
        let flags = OrderFlags::decode(self.flags)?;
        Ok(NormalizedOrder {
            sell_token: token(self.sell_token_index)?,
            buy_token: token(self.buy_token_index)?,
            receiver: self.receiver,
            sell_amount: self.sell_amount,
            buy_amount: self.buy_amount,
            valid_to: self.valid_to,
            app_data: self.app_data,
            fee_amount: self.fee_amount,
            kind: flags.kind,
            partially_fillable: flags.partially_fillable,
            sell_token_balance: flags.sell_token_balance,
            buy_token_balance: flags.buy_token_balance,
        })
    }

    /// Recomputes the UID of the traded order. The owner is recovered from
    /// the signature for ECDSA schemes and read from it otherwise.
    pub fn recover_order_uid(
        &self,
        tokens: &[Address],
        domain_separator: &DomainSeparator,
    ) -> Result<OrderUid> {
        let order = self.decode_normalized_order(tokens)?;
        let scheme = decode_signing_scheme(self.flags)?;
        let signature = Signature::from_encoded(scheme, &self.signature)?;
        let owner = signature.owner(domain_separator, &order.hash_struct())?;
        Ok(order.uid(domain_separator, &owner))
    }
}

impl From<EncodedTrade> for GPv2Trade::Data {
    fn from(trade: EncodedTrade) -> Self {
        Self {
            sellTokenIndex: U256::from(trade.sell_token_index),
            buyTokenIndex: U256::from(trade.buy_token_index),
            receiver: trade.receiver,
            sellAmount: trade.sell_amount,
            buyAmount: trade.buy_amount,
            validTo: trade.valid_to,
            appData: trade.app_data,
            feeAmount: trade.fee_amount,
            flags: trade.flags,
            executedAmount: trade.executed_amount,
            signature: trade.signature,
        }
    }
}

/// Parses a signature from the name of its scheme and its settlement
/// encoding, e.g. as submitted alongside an order.
pub fn decode_signature(scheme: &str, signature: &[u8]) -> Result<Signature> {
    let scheme = scheme.parse::<SigningScheme>()?;
    Ok(Signature::from_encoded(scheme, signature)?)
}

/// Flattens a signed order into a trade, interning its tokens into
/// `tokens`. Nothing is interned when the order is rejected.
pub(crate) fn encode_trade(
    tokens: &mut TokenRegistry,
    order: &Order,
    signature: &Signature,
    execution: TradeExecution,
) -> Result<EncodedTrade> {
    if order.partially_fillable && execution.executed_amount.is_none() {
        return Err(Error::MissingExecutedAmount);
    }
    let order = order.normalize()?;
    signature.validate()?;
    let flags = TradeFlags {
        order: OrderFlags::from(&order),
        signing_scheme: signature.scheme(),
    };
    Ok(EncodedTrade {
        sell_token_index: tokens.index(order.sell_token),
        buy_token_index: tokens.index(order.buy_token),
        receiver: order.receiver,
        sell_amount: order.sell_amount,
        buy_amount: order.buy_amount,
        valid_to: order.valid_to,
        app_data: order.app_data,
        fee_amount: order.fee_amount,
        flags: flags.encode(),
        executed_amount: execution.executed_amount.unwrap_or_default(),
        signature: signature.encode_for_settlement(),
    })
}
