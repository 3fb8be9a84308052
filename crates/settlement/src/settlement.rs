use {
    crate::{
        contracts::{GPv2Interaction, GPv2Settlement},
        error::{Error, Result},
        signing::{TypedDataSigner, sign_order},
        tokens::TokenRegistry,
        trade::{EncodedTrade, TradeExecution, encode_trade},
    },
    alloy::{
        primitives::{Address, Bytes, U256},
        sol_types::SolCall,
    },
    model::{
        Domain,
        DomainSeparator,
        interaction::{Interaction, InteractionStage},
        order::Order,
        order_uid::extract_order_uid_params,
        signature::{EcdsaSigningScheme, Signature},
    },
    number::serialization::HexOrDecimalU256,
    serde::Serialize,
    serde_with::serde_as,
    std::collections::HashMap,
};

/// Order UIDs whose storage in the settlement contract should be freed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OrderRefunds {
    /// Orders whose filled amount is cleared.
    pub filled_amounts: Vec<Bytes>,
    /// Orders whose pre-signature is cleared.
    pub pre_signatures: Vec<Bytes>,
}

impl OrderRefunds {
    pub fn is_empty(&self) -> bool {
        self.filled_amounts.is_empty() && self.pre_signatures.is_empty()
    }
}

/// Builds the arguments of a `settle` call one trade and interaction at a
/// time.
///
/// The encoder is consumed by [`SettlementEncoder::encoded_settlement`], so
/// a settlement can only be finalized once.
#[derive(Clone, Debug)]
pub struct SettlementEncoder {
    domain: Domain,
    domain_separator: DomainSeparator,
    tokens: TokenRegistry,
    trades: Vec<EncodedTrade>,
    interactions: [Vec<Interaction>; 3],
    order_refunds: OrderRefunds,
}

impl SettlementEncoder {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain_separator: domain.separator(),
            domain,
            tokens: Default::default(),
            trades: Default::default(),
            interactions: Default::default(),
            order_refunds: Default::default(),
        }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn domain_separator(&self) -> &DomainSeparator {
        &self.domain_separator
    }

    /// The tokens of all trades encoded so far.
    pub fn tokens(&self) -> Vec<Address> {
        self.tokens.addresses()
    }

    pub fn trades(&self) -> &[EncodedTrade] {
        &self.trades
    }

    /// Interactions of all stages with the order refunds appended to the
    /// post interactions.
    pub fn interactions(&self) -> [Vec<Interaction>; 3] {
        let mut interactions = self.interactions.clone();
        interactions[InteractionStage::Post.index()].extend(self.encoded_order_refunds());
        interactions
    }

    /// Appends a trade for an order with an existing signature.
    pub fn encode_trade(
        &mut self,
        order: &Order,
        signature: &Signature,
        execution: TradeExecution,
    ) -> Result<()> {
        let trade = encode_trade(&mut self.tokens, order, signature, execution)?;
        tracing::debug!(
            index = self.trades.len(),
            sell_token_index = trade.sell_token_index,
            buy_token_index = trade.buy_token_index,
            flags = %trade.flags,
            "encoded trade"
        );
        self.trades.push(trade);
        Ok(())
    }

    /// Signs an order and appends its trade. Nothing is recorded if signing
    /// fails.
    pub async fn sign_encode_trade<S>(
        &mut self,
        order: &Order,
        signer: &S,
        scheme: EcdsaSigningScheme,
        execution: TradeExecution,
    ) -> Result<()>
    where
        S: TypedDataSigner + ?Sized,
    {
        let signature = sign_order(&self.domain, order, signer, scheme).await?;
        self.encode_trade(order, &signature, execution)
    }

    pub fn encode_interaction(&mut self, interaction: Interaction, stage: InteractionStage) {
        tracing::debug!(?stage, target = ?interaction.target, "encoded interaction");
        self.interactions[stage.index()].push(interaction);
    }

    /// Queues order UIDs whose contract storage gets freed in a post
    /// interaction. The refunds are only validated here; the interactions
    /// are built when the settlement is finalized.
    pub fn encode_order_refunds(&mut self, refunds: OrderRefunds) -> Result<()> {
        if self.domain.verifying_contract.is_none() {
            return Err(Error::MissingVerifyingContract);
        }
        for uid in refunds
            .filled_amounts
            .iter()
            .chain(&refunds.pre_signatures)
        {
            extract_order_uid_params(uid)?;
        }
        if refunds.is_empty() {
            return Ok(());
        }

        tracing::warn!(
            filled_amounts = refunds.filled_amounts.len(),
            pre_signatures = refunds.pre_signatures.len(),
            "queued order refunds, these cost more gas than they refund"
        );
        self.order_refunds
            .filled_amounts
            .extend(refunds.filled_amounts);
        self.order_refunds
            .pre_signatures
            .extend(refunds.pre_signatures);
        Ok(())
    }

    /// One interaction per non-empty refund list, calling the matching
    /// storage freeing function of the settlement contract.
    fn encoded_order_refunds(&self) -> Vec<Interaction> {
        let Some(settlement) = self.domain.verifying_contract else {
            return Vec::new();
        };
        let OrderRefunds {
            filled_amounts,
            pre_signatures,
        } = &self.order_refunds;

        let mut interactions = Vec::new();
        if !filled_amounts.is_empty() {
            let call = GPv2Settlement::freeFilledAmountStorageCall {
                orderUids: filled_amounts.clone(),
            };
            interactions.push(Interaction::new(settlement).with_call_data(call.abi_encode()));
        }
        if !pre_signatures.is_empty() {
            let call = GPv2Settlement::freePreSignatureStorageCall {
                orderUids: pre_signatures.clone(),
            };
            interactions.push(Interaction::new(settlement).with_call_data(call.abi_encode()));
        }
        interactions
    }

    /// Looks up the price of every token of the settlement, in token order.
    pub fn clearing_prices(&self, prices: &HashMap<Address, U256>) -> Result<Vec<U256>> {
        self.tokens
            .addresses()
            .into_iter()
            .map(|token| prices.get(&token).copied().ok_or(Error::MissingPrice(token)))
            .collect()
    }

    /// Finalizes the settlement with the given clearing prices.
    pub fn encoded_settlement(self, prices: &HashMap<Address, U256>) -> Result<EncodedSettlement> {
        let clearing_prices = self.clearing_prices(prices)?;
        let interactions = self.interactions();
        tracing::debug!(
            tokens = self.tokens.len(),
            trades = self.trades.len(),
            "encoded settlement"
        );
        Ok(EncodedSettlement {
            tokens: self.tokens.into_addresses(),
            clearing_prices,
            trades: self.trades,
            interactions,
        })
    }

    /// A settlement without trades that only executes the given
    /// interactions, for example to set allowances.
    pub fn encoded_setup(interactions: impl IntoIterator<Item = Interaction>) -> EncodedSettlement {
        EncodedSettlement {
            interactions: [
                Vec::new(),
                interactions.into_iter().collect(),
                Vec::new(),
            ],
            ..Default::default()
        }
    }
}

/// Arguments of the settlement contract's `settle` function.
#[serde_as]
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedSettlement {
    pub tokens: Vec<Address>,
    #[serde_as(as = "Vec<HexOrDecimalU256>")]
    pub clearing_prices: Vec<U256>,
    pub trades: Vec<EncodedTrade>,
    pub interactions: [Vec<Interaction>; 3],
}

impl EncodedSettlement {
    /// ABI encoded `settle` calldata.
    pub fn calldata(&self) -> Bytes {
        let [pre, intra, post] = self.interactions.clone().map(|stage| {
            stage
                .into_iter()
                .map(|interaction| GPv2Interaction::Data {
                    target: interaction.target,
                    value: interaction.value,
                    callData: interaction.call_data,
                })
                .collect::<Vec<_>>()
        });
        GPv2Settlement::settleCall {
            tokens: self.tokens.clone(),
            clearingPrices: self.clearing_prices.clone(),
            trades: self.trades.iter().cloned().map(Into::into).collect(),
            interactions: [pre, intra, post],
        }
        .abi_encode()
        .into()
    }
}
