use {
    crate::{
        contracts::{GPv2Settlement, IVault},
        error::{Error, Result},
        signing::{TypedDataSigner, sign_order},
        tokens::TokenRegistry,
        trade::{EncodedTrade, TradeExecution, encode_trade},
    },
    alloy::{
        primitives::{Address, B256, Bytes, U256},
        sol_types::SolCall,
    },
    model::{
        Domain,
        order::{Order, OrderKind},
        signature::{EcdsaSigningScheme, Signature},
    },
    number::serialization::HexOrDecimalU256,
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
};

/// A single hop through a Balancer Vault pool.
#[serde_as]
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Swap {
    pub pool_id: B256,
    pub asset_in: Address,
    pub asset_out: Address,
    #[serde_as(as = "HexOrDecimalU256")]
    pub amount: U256,
    #[serde(default)]
    pub user_data: Bytes,
}

/// A [`Swap`] with its assets replaced by indices into the swap's token list.
#[serde_as]
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSwapStep {
    pub pool_id: B256,
    pub asset_in_index: usize,
    pub asset_out_index: usize,
    #[serde_as(as = "HexOrDecimalU256")]
    pub amount: U256,
    pub user_data: Bytes,
}

impl From<BatchSwapStep> for IVault::BatchSwapStep {
    fn from(step: BatchSwapStep) -> Self {
        Self {
            poolId: step.pool_id,
            assetInIndex: U256::from(step.asset_in_index),
            assetOutIndex: U256::from(step.asset_out_index),
            amount: step.amount,
            userData: step.user_data,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SwapExecution {
    /// The worst amount the order accepts: the minimum buy amount of a sell
    /// order or the maximum sell amount of a buy order. Defaults to the
    /// order's limit.
    pub limit_amount: Option<U256>,
}

/// Builds the arguments of a `swap` call that settles a single order
/// directly against Balancer pools.
#[derive(Clone, Debug)]
pub struct SwapEncoder {
    domain: Domain,
    tokens: TokenRegistry,
    swaps: Vec<BatchSwapStep>,
    trade: Option<EncodedTrade>,
}

impl SwapEncoder {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            tokens: Default::default(),
            swaps: Default::default(),
            trade: None,
        }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn tokens(&self) -> Vec<Address> {
        self.tokens.addresses()
    }

    pub fn swaps(&self) -> &[BatchSwapStep] {
        &self.swaps
    }

    pub fn trade(&self) -> Result<&EncodedTrade> {
        self.trade.as_ref().ok_or(Error::TradeNotEncoded)
    }

    pub fn encode_swap_step(&mut self, swaps: impl IntoIterator<Item = Swap>) {
        for swap in swaps {
            let step = BatchSwapStep {
                asset_in_index: self.tokens.index(swap.asset_in),
                asset_out_index: self.tokens.index(swap.asset_out),
                pool_id: swap.pool_id,
                amount: swap.amount,
                user_data: swap.user_data,
            };
            tracing::debug!(
                pool_id = %step.pool_id,
                asset_in_index = step.asset_in_index,
                asset_out_index = step.asset_out_index,
                "encoded swap step"
            );
            self.swaps.push(step);
        }
    }

    /// Sets the order that gets swapped, replacing any previously encoded
    /// one. Tokens of a replaced trade stay in the token list, since swap
    /// steps may already refer to their indices. The limit amount is passed
    /// to the contract as the trade's executed amount.
    pub fn encode_trade(
        &mut self,
        order: &Order,
        signature: &Signature,
        execution: SwapExecution,
    ) -> Result<()> {
        let limit_amount = execution.limit_amount.unwrap_or(match order.kind {
            OrderKind::Sell => order.buy_amount,
            OrderKind::Buy => order.sell_amount,
        });
        let trade = encode_trade(
            &mut self.tokens,
            order,
            signature,
            TradeExecution {
                executed_amount: Some(limit_amount),
            },
        )?;
        tracing::debug!(%limit_amount, replaced = self.trade.is_some(), "encoded swap trade");
        self.trade = Some(trade);
        Ok(())
    }

    pub async fn sign_encode_trade<S>(
        &mut self,
        order: &Order,
        signer: &S,
        scheme: EcdsaSigningScheme,
        execution: SwapExecution,
    ) -> Result<()>
    where
        S: TypedDataSigner + ?Sized,
    {
        let signature = sign_order(&self.domain, order, signer, scheme).await?;
        self.encode_trade(order, &signature, execution)
    }

    /// Finalizes the swap. Fails if no trade was encoded.
    pub fn encoded_swap(self) -> Result<EncodedSwap> {
        let trade = self.trade.ok_or(Error::TradeNotEncoded)?;
        Ok(EncodedSwap {
            swaps: self.swaps,
            tokens: self.tokens.into_addresses(),
            trade,
        })
    }

    /// Encodes a swap of a single order in one go.
    pub fn encode_swap(
        domain: Domain,
        swaps: impl IntoIterator<Item = Swap>,
        order: &Order,
        signature: &Signature,
        execution: SwapExecution,
    ) -> Result<EncodedSwap> {
        let mut encoder = Self::new(domain);
        encoder.encode_swap_step(swaps);
        encoder.encode_trade(order, signature, execution)?;
        encoder.encoded_swap()
    }
}

/// Arguments of the settlement contract's `swap` function.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedSwap {
    pub swaps: Vec<BatchSwapStep>,
    pub tokens: Vec<Address>,
    pub trade: EncodedTrade,
}

impl EncodedSwap {
    /// ABI encoded `swap` calldata.
    pub fn calldata(&self) -> Bytes {
        GPv2Settlement::swapCall {
            swaps: self.swaps.iter().cloned().map(Into::into).collect(),
            tokens: self.tokens.clone(),
            trade: self.trade.clone().into(),
        }
        .abi_encode()
        .into()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{contracts::GPv2Trade, signing::MockTypedDataSigner},
        model::order::Timestamp,
    };

    fn order(kind: OrderKind) -> Order {
        Order {
            sell_token: Address::repeat_byte(0x11),
            buy_token: Address::repeat_byte(0x22),
            sell_amount: U256::from(100),
            buy_amount: U256::from(50),
            valid_to: Timestamp::Unix(1000),
            kind,
            ..Default::default()
        }
    }

    fn swap(pool: u8, asset_in: Address, asset_out: Address) -> Swap {
        Swap {
            pool_id: B256::repeat_byte(pool),
            asset_in,
            asset_out,
            amount: U256::from(100),
            user_data: Bytes::new(),
        }
    }

    fn signature() -> Signature {
        Signature::PreSign(Address::repeat_byte(0xaa))
    }

    #[test]
    fn limit_amount_defaults_to_order_limit() {
        for (kind, expected) in [(OrderKind::Sell, 50), (OrderKind::Buy, 100)] {
            let mut encoder = SwapEncoder::new(Domain::default());
            encoder
                .encode_trade(&order(kind), &signature(), Default::default())
                .unwrap();
            assert_eq!(encoder.trade().unwrap().executed_amount, U256::from(expected));
        }

        let mut encoder = SwapEncoder::new(Domain::default());
        encoder
            .encode_trade(
                &order(OrderKind::Sell),
                &signature(),
                SwapExecution {
                    limit_amount: Some(U256::from(60)),
                },
            )
            .unwrap();
        assert_eq!(encoder.trade().unwrap().executed_amount, U256::from(60));
    }

    #[test]
    fn partially_fillable_orders_use_limit_amount() {
        let mut encoder = SwapEncoder::new(Domain::default());
        let order = Order {
            partially_fillable: true,
            ..order(OrderKind::Sell)
        };
        encoder
            .encode_trade(&order, &signature(), Default::default())
            .unwrap();
        assert_eq!(encoder.trade().unwrap().executed_amount, U256::from(50));
    }

    #[test]
    fn swap_requires_trade() {
        let mut encoder = SwapEncoder::new(Domain::default());
        encoder.encode_swap_step([swap(1, Address::repeat_byte(0x11), Address::repeat_byte(0x22))]);
        assert!(matches!(encoder.trade(), Err(Error::TradeNotEncoded)));
        assert!(matches!(
            encoder.encoded_swap(),
            Err(Error::TradeNotEncoded)
        ));
    }

    #[test]
    fn swap_steps_and_trade_share_tokens() {
        let (sell, intermediate, buy) = (
            Address::repeat_byte(0x11),
            Address::repeat_byte(0x33),
            Address::repeat_byte(0x22),
        );
        let encoded = SwapEncoder::encode_swap(
            Domain::default(),
            [swap(1, sell, intermediate), swap(2, intermediate, buy)],
            &order(OrderKind::Sell),
            &signature(),
            Default::default(),
        )
        .unwrap();

        assert_eq!(encoded.tokens, vec![sell, intermediate, buy]);
        assert_eq!(
            encoded
                .swaps
                .iter()
                .map(|step| (step.asset_in_index, step.asset_out_index))
                .collect::<Vec<_>>(),
            vec![(0, 1), (1, 2)]
        );
        assert_eq!(encoded.trade.sell_token_index, 0);
        assert_eq!(encoded.trade.buy_token_index, 2);
    }

    #[test]
    fn swap_registry_is_independent() {
        let mut encoder = SwapEncoder::new(Domain::default());
        encoder
            .encode_trade(&order(OrderKind::Sell), &signature(), Default::default())
            .unwrap();
        let trade = encoder.encoded_swap().unwrap().trade;
        assert_eq!((trade.sell_token_index, trade.buy_token_index), (0, 1));
    }

    #[test]
    fn later_trades_replace_earlier_ones() {
        let mut encoder = SwapEncoder::new(Domain::default());
        encoder
            .encode_trade(&order(OrderKind::Sell), &signature(), Default::default())
            .unwrap();
        encoder
            .encode_trade(&order(OrderKind::Buy), &signature(), Default::default())
            .unwrap();
        let encoded = encoder.encoded_swap().unwrap();
        assert_eq!(encoded.trade.executed_amount, U256::from(100));
        assert!(encoded.trade.flags.bit(0));
    }

    #[test]
    fn replaced_trades_keep_their_tokens() {
        let (weth, dai) = (Address::repeat_byte(0xee), Address::repeat_byte(0xda));
        let mut encoder = SwapEncoder::new(Domain::default());
        encoder
            .encode_trade(&order(OrderKind::Sell), &signature(), Default::default())
            .unwrap();
        encoder
            .encode_trade(
                &Order {
                    sell_token: weth,
                    buy_token: dai,
                    ..order(OrderKind::Sell)
                },
                &signature(),
                Default::default(),
            )
            .unwrap();
        let encoded = encoder.encoded_swap().unwrap();
        assert_eq!(
            encoded.tokens,
            vec![
                Address::repeat_byte(0x11),
                Address::repeat_byte(0x22),
                weth,
                dai
            ]
        );
        assert_eq!(encoded.trade.sell_token_index, 2);
        assert_eq!(encoded.trade.buy_token_index, 3);
    }

    #[tokio::test]
    async fn signs_swap_trades() {
        let mut signer = MockTypedDataSigner::new();
        signer.expect_sign_typed_data().returning(|_, _| {
            let mut bytes = vec![0x01; 64];
            bytes.push(0);
            Ok(bytes.into())
        });

        let mut encoder = SwapEncoder::new(Domain::default());
        encoder
            .sign_encode_trade(
                &order(OrderKind::Sell),
                &signer,
                EcdsaSigningScheme::Eip712,
                Default::default(),
            )
            .await
            .unwrap();
        let trade = encoder.trade().unwrap();
        assert_eq!(trade.signature.len(), 65);
        assert_eq!(trade.signature[64], 27);
        assert_eq!(trade.flags, U256::ZERO);
    }

    #[test]
    fn calldata_decodes_to_swap() {
        let (sell, buy) = (Address::repeat_byte(0x11), Address::repeat_byte(0x22));
        let encoded = SwapEncoder::encode_swap(
            Domain::default(),
            [Swap {
                user_data: Bytes::from(vec![0xca, 0xfe]),
                ..swap(7, sell, buy)
            }],
            &order(OrderKind::Sell),
            &signature(),
            Default::default(),
        )
        .unwrap();

        let call = GPv2Settlement::swapCall::abi_decode(&encoded.calldata()).unwrap();
        assert_eq!(call.tokens, vec![sell, buy]);
        assert_eq!(call.swaps.len(), 1);
        assert_eq!(call.swaps[0].poolId, B256::repeat_byte(7));
        assert_eq!(call.swaps[0].assetInIndex, U256::ZERO);
        assert_eq!(call.swaps[0].assetOutIndex, U256::from(1));
        assert_eq!(call.swaps[0].userData[..], [0xca, 0xfe]);
        assert_eq!(call.trade, GPv2Trade::Data::from(encoded.trade));
    }
}
