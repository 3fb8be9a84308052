//! Orders, their normalization into the signed representation and EIP-712
//! hashing.

use {
    crate::{DomainSeparator, hashed_eip712_message, order_uid::OrderUid},
    alloy::primitives::{Address, B256, Bytes, U256, address, keccak256},
    chrono::{DateTime, Utc},
    hex_literal::hex,
    number::serialization::HexOrDecimalU256,
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
    strum::{Display, EnumString},
};

/// The flag denoting that an order is buying ETH (or the chain's native
/// token). It is used in place of an actual buy token address in an order.
pub const BUY_ETH_ADDRESS: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum NormalizeError {
    #[error("receiver cannot be the zero address, leave it unset instead")]
    ZeroReceiver,
    #[error("app data must be at most 32 bytes but got {0}")]
    AppDataTooLong(usize),
    #[error("timestamp {0} does not fit into a uint32")]
    TimestampOutOfRange(i64),
}

/// Order validity, either as a unix timestamp in seconds or a calendar date.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Timestamp {
    Unix(u32),
    Date(DateTime<Utc>),
}

impl Timestamp {
    /// Returns the timestamp in seconds. Dates are truncated to whole seconds.
    pub fn normalize(&self) -> Result<u32, NormalizeError> {
        match self {
            Self::Unix(seconds) => Ok(*seconds),
            Self::Date(date) => {
                let seconds = date.timestamp_millis().div_euclid(1000);
                u32::try_from(seconds).map_err(|_| NormalizeError::TimestampOutOfRange(seconds))
            }
        }
    }
}

impl From<u32> for Timestamp {
    fn from(seconds: u32) -> Self {
        Self::Unix(seconds)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(date: DateTime<Utc>) -> Self {
        Self::Date(date)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::Unix(0)
    }
}

/// Application specific data attached to an order. Either a 32 byte hash or a
/// small integer identifier that gets zero padded into one.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AppData {
    Number(u64),
    Hash(Bytes),
}

impl AppData {
    pub fn normalize(&self) -> Result<B256, NormalizeError> {
        match self {
            Self::Number(value) => Ok(B256::from(U256::from(*value).to_be_bytes::<32>())),
            Self::Hash(bytes) => {
                if bytes.len() > 32 {
                    return Err(NormalizeError::AppDataTooLong(bytes.len()));
                }
                let mut hash = B256::ZERO;
                hash[32 - bytes.len()..].copy_from_slice(bytes);
                Ok(hash)
            }
        }
    }
}

impl Default for AppData {
    fn default() -> Self {
        Self::Number(0)
    }
}

impl From<B256> for AppData {
    fn from(hash: B256) -> Self {
        Self::Hash(Bytes::copy_from_slice(hash.as_slice()))
    }
}

/// An order as it is created by a user, before normalization.
#[serde_as]
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub sell_token: Address,
    pub buy_token: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Address>,
    #[serde_as(as = "HexOrDecimalU256")]
    pub sell_amount: U256,
    #[serde_as(as = "HexOrDecimalU256")]
    pub buy_amount: U256,
    pub valid_to: Timestamp,
    pub app_data: AppData,
    #[serde_as(as = "HexOrDecimalU256")]
    pub fee_amount: U256,
    pub kind: OrderKind,
    pub partially_fillable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell_token_balance: Option<OrderBalance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_token_balance: Option<OrderBalance>,
}

impl Order {
    /// Projects the order onto the exact values that get hashed and signed.
    ///
    /// An unset receiver means the owner receives the proceeds and is encoded
    /// as the zero address. Passing the zero address explicitly is rejected so
    /// that the two cases cannot be confused.
    pub fn normalize(&self) -> Result<NormalizedOrder, NormalizeError> {
        let receiver = match self.receiver {
            Some(receiver) if receiver.is_zero() => return Err(NormalizeError::ZeroReceiver),
            Some(receiver) => receiver,
            None => Address::ZERO,
        };
        Ok(NormalizedOrder {
            sell_token: self.sell_token,
            buy_token: self.buy_token,
            receiver,
            sell_amount: self.sell_amount,
            buy_amount: self.buy_amount,
            valid_to: self.valid_to.normalize()?,
            app_data: self.app_data.normalize()?,
            fee_amount: self.fee_amount,
            kind: self.kind,
            partially_fillable: self.partially_fillable,
            sell_token_balance: self.sell_token_balance.unwrap_or_default(),
            buy_token_balance: normalize_buy_token_balance(self.buy_token_balance),
        })
    }
}

/// Vault balances can't be used as a buy destination, so anything but an
/// internal balance is paid out as a regular ERC20 transfer.
pub fn normalize_buy_token_balance(balance: Option<OrderBalance>) -> OrderBalance {
    match balance {
        Some(OrderBalance::Internal) => OrderBalance::Internal,
        Some(OrderBalance::Erc20 | OrderBalance::External) | None => OrderBalance::Erc20,
    }
}

/// The exact order fields that get signed and verified by the settlement
/// contract.
#[serde_as]
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedOrder {
    pub sell_token: Address,
    pub buy_token: Address,
    pub receiver: Address,
    #[serde_as(as = "HexOrDecimalU256")]
    pub sell_amount: U256,
    #[serde_as(as = "HexOrDecimalU256")]
    pub buy_amount: U256,
    pub valid_to: u32,
    pub app_data: B256,
    #[serde_as(as = "HexOrDecimalU256")]
    pub fee_amount: U256,
    pub kind: OrderKind,
    pub partially_fillable: bool,
    pub sell_token_balance: OrderBalance,
    pub buy_token_balance: OrderBalance,
}

impl NormalizedOrder {
    /// The order EIP-712 type name.
    pub const TYPE_NAME: &str = "Order";

    /// The fields of the `Order` EIP-712 struct in encoding order.
    pub const TYPE_FIELDS: [(&str, &str); 12] = [
        ("sellToken", "address"),
        ("buyToken", "address"),
        ("receiver", "address"),
        ("sellAmount", "uint256"),
        ("buyAmount", "uint256"),
        ("validTo", "uint32"),
        ("appData", "bytes32"),
        ("feeAmount", "uint256"),
        ("kind", "string"),
        ("partiallyFillable", "bool"),
        ("sellTokenBalance", "string"),
        ("buyTokenBalance", "string"),
    ];

    // See <https://github.com/cowprotocol/contracts/blob/v1.1.2/src/contracts/libraries/GPv2Order.sol#L47>
    pub const TYPE_HASH: [u8; 32] =
        hex!("d5a25ba2e97094ad7d83dc28a6572da797d6b3e7fc6663bd93efb789fc17e489");

    /// Returns the `encodeType` string of the order struct.
    pub fn encode_type() -> String {
        let fields = Self::TYPE_FIELDS
            .iter()
            .map(|(name, ty)| format!("{ty} {name}"))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({fields})", Self::TYPE_NAME)
    }

    /// Returns the value of hashStruct() over the order data as defined by EIP-712.
    ///
    /// https://eips.ethereum.org/EIPS/eip-712#definition-of-hashstruct
    pub fn hash_struct(&self) -> [u8; 32] {
        let mut hash_data = [0u8; 416];
        hash_data[0..32].copy_from_slice(&Self::TYPE_HASH);
        // Some slots are not assigned (stay 0) because all values are extended to 256 bits.
        hash_data[44..64].copy_from_slice(self.sell_token.as_slice());
        hash_data[76..96].copy_from_slice(self.buy_token.as_slice());
        hash_data[108..128].copy_from_slice(self.receiver.as_slice());
        hash_data[128..160].copy_from_slice(&self.sell_amount.to_be_bytes::<32>());
        hash_data[160..192].copy_from_slice(&self.buy_amount.to_be_bytes::<32>());
        hash_data[220..224].copy_from_slice(&self.valid_to.to_be_bytes());
        hash_data[224..256].copy_from_slice(self.app_data.as_slice());
        hash_data[256..288].copy_from_slice(&self.fee_amount.to_be_bytes::<32>());
        hash_data[288..320].copy_from_slice(&self.kind.contract_bytes());
        hash_data[351] = self.partially_fillable as u8;
        hash_data[352..384].copy_from_slice(&self.sell_token_balance.contract_bytes());
        hash_data[384..416].copy_from_slice(&self.buy_token_balance.contract_bytes());
        keccak256(hash_data).0
    }

    /// The EIP-712 digest that gets signed and identifies the order content.
    pub fn signing_digest(&self, domain: &DomainSeparator) -> [u8; 32] {
        hashed_eip712_message(domain, &self.hash_struct())
    }

    pub fn uid(&self, domain: &DomainSeparator, owner: &Address) -> OrderUid {
        OrderUid::from_parts(
            B256::from(self.signing_digest(domain)),
            *owner,
            self.valid_to,
        )
    }
}

impl From<NormalizedOrder> for Order {
    fn from(order: NormalizedOrder) -> Self {
        Self {
            sell_token: order.sell_token,
            buy_token: order.buy_token,
            receiver: (!order.receiver.is_zero()).then_some(order.receiver),
            sell_amount: order.sell_amount,
            buy_amount: order.buy_amount,
            valid_to: Timestamp::Unix(order.valid_to),
            app_data: AppData::from(order.app_data),
            fee_amount: order.fee_amount,
            kind: order.kind,
            partially_fillable: order.partially_fillable,
            sell_token_balance: Some(order.sell_token_balance),
            buy_token_balance: Some(order.buy_token_balance),
        }
    }
}

/// Computes the EIP-712 signing digest of an order.
pub fn hash_order(domain: &DomainSeparator, order: &Order) -> Result<[u8; 32], NormalizeError> {
    Ok(order.normalize()?.signing_digest(domain))
}

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
#[error("unknown {kind} contract value {value}")]
pub struct UnknownContractValue {
    pub kind: &'static str,
    pub value: B256,
}

#[derive(
    Eq, PartialEq, Clone, Copy, Debug, Default, Deserialize, Serialize, Hash, EnumString, Display,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    #[default]
    Sell,
    Buy,
}

impl OrderKind {
    // keccak256("sell")
    pub const SELL: [u8; 32] =
        hex!("f3b277728b3fee749481eb3e0b3b48980dbbab78658fc419025cb16eee346775");
    // keccak256("buy")
    pub const BUY: [u8; 32] =
        hex!("6ed88e868af0a1983e3886d5f3e95a2fafbd6c3450bc229e27342283dc429ccc");

    pub fn contract_bytes(&self) -> [u8; 32] {
        match self {
            Self::Sell => Self::SELL,
            Self::Buy => Self::BUY,
        }
    }

    pub fn from_contract_bytes(kind: [u8; 32]) -> Result<Self, UnknownContractValue> {
        match kind {
            Self::SELL => Ok(Self::Sell),
            Self::BUY => Ok(Self::Buy),
            _ => Err(UnknownContractValue {
                kind: "order kind",
                value: B256::from(kind),
            }),
        }
    }
}

/// Where the sell amount is drawn from, or where the buy amount is paid to.
#[derive(
    Eq, PartialEq, Clone, Copy, Debug, Default, Deserialize, Serialize, Hash, EnumString, Display,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum OrderBalance {
    /// Direct ERC20 allowances to the Vault relayer contract.
    #[default]
    Erc20,
    /// ERC20 allowances to the Vault with GPv2 relayer approval. Only valid
    /// as a sell token source.
    External,
    /// Internal balances to the Vault with GPv2 relayer approval.
    Internal,
}

impl OrderBalance {
    // keccak256("erc20")
    pub const ERC20: [u8; 32] =
        hex!("5a28e9363bb942b639270062aa6bb295f434bcdfc42c97267bf003f272060dc9");
    // keccak256("external")
    pub const EXTERNAL: [u8; 32] =
        hex!("abee3b73373acd583a130924aad6dc38cfdc44ba0555ba94ce2ff63980ea0632");
    // keccak256("internal")
    pub const INTERNAL: [u8; 32] =
        hex!("4ac99ace14ee0a5ef932dc609df0943ab7ac16b7583634612f8dc35a4289a6ce");

    pub fn contract_bytes(&self) -> [u8; 32] {
        match self {
            Self::Erc20 => Self::ERC20,
            Self::External => Self::EXTERNAL,
            Self::Internal => Self::INTERNAL,
        }
    }

    pub fn from_contract_bytes(bytes: [u8; 32]) -> Result<Self, UnknownContractValue> {
        match bytes {
            Self::ERC20 => Ok(Self::Erc20),
            Self::EXTERNAL => Ok(Self::External),
            Self::INTERNAL => Ok(Self::Internal),
            _ => Err(UnknownContractValue {
                kind: "order balance",
                value: B256::from(bytes),
            }),
        }
    }
}

/// Cancellation of multiple orders.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCancellations {
    pub order_uids: Vec<OrderUid>,
}

impl OrderCancellations {
    /// The EIP-712 type hash for order cancellations. Computed with:
    /// `keccak256("OrderCancellations(bytes[] orderUid)")`.
    const TYPE_HASH: [u8; 32] =
        hex!("4c89efb91ae246f78d2fe68b47db2fa1444a121a4f2dc3fda7a5a408c2e3588e");

    pub fn hash_struct(&self) -> [u8; 32] {
        let mut encoded_uids = Vec::with_capacity(32 * self.order_uids.len());
        for order_uid in &self.order_uids {
            encoded_uids.extend_from_slice(keccak256(order_uid.0).as_slice());
        }

        let array_hash = keccak256(&encoded_uids);

        let mut hash_data = [0u8; 64];
        hash_data[0..32].copy_from_slice(&Self::TYPE_HASH);
        hash_data[32..64].copy_from_slice(array_hash.as_slice());
        keccak256(hash_data).0
    }
}

/// Cancellation of a single order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCancellation {
    pub order_uid: OrderUid,
}

impl OrderCancellation {
    // keccak256("OrderCancellation(bytes orderUid)")
    const TYPE_HASH: [u8; 32] =
        hex!("7b41b3a6e2b3cae020a3b2f9cdc997e0d420643957e7fea81747e984e47c88ec");

    pub fn hash_struct(&self) -> [u8; 32] {
        let mut hash_data = [0u8; 64];
        hash_data[0..32].copy_from_slice(&Self::TYPE_HASH);
        hash_data[32..64].copy_from_slice(keccak256(self.order_uid.0).as_slice());
        keccak256(hash_data).0
    }
}
