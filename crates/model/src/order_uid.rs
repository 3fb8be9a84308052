use {
    crate::{
        DomainSeparator,
        order::{NormalizeError, Order},
    },
    alloy::primitives::{Address, B256},
    serde::{Deserialize, Deserializer, Serialize, Serializer, de},
    std::{
        fmt::{self, Display},
        str::FromStr,
    },
};

/// The byte length of an order UID.
pub const ORDER_UID_LENGTH: usize = 56;

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
#[error("order UID must be {ORDER_UID_LENGTH} bytes long but got {length}")]
pub struct InvalidOrderUid {
    pub length: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseOrderUidError {
    #[error(transparent)]
    Hex(#[from] const_hex::FromHexError),
    #[error(transparent)]
    Length(#[from] InvalidOrderUid),
}

// uid as 56 bytes: 32 for orderDigest, 20 for ownerAddress and 4 for validTo
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct OrderUid(pub [u8; ORDER_UID_LENGTH]);

impl OrderUid {
    /// Create a UID from its parts.
    pub fn from_parts(hash: B256, owner: Address, valid_to: u32) -> Self {
        let mut uid = [0; ORDER_UID_LENGTH];
        uid[0..32].copy_from_slice(hash.as_slice());
        uid[32..52].copy_from_slice(owner.as_slice());
        uid[52..56].copy_from_slice(&valid_to.to_be_bytes());
        Self(uid)
    }

    /// Splits an order UID into its parts.
    pub fn parts(&self) -> (B256, Address, u32) {
        let mut valid_to = [0u8; 4];
        valid_to.copy_from_slice(&self.0[52..56]);
        (
            B256::from_slice(&self.0[0..32]),
            Address::from_slice(&self.0[32..52]),
            u32::from_be_bytes(valid_to),
        )
    }
}

impl TryFrom<&[u8]> for OrderUid {
    type Error = InvalidOrderUid;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let uid = <[u8; ORDER_UID_LENGTH]>::try_from(bytes).map_err(|_| InvalidOrderUid {
            length: bytes.len(),
        })?;
        Ok(Self(uid))
    }
}

impl AsRef<[u8]> for OrderUid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for OrderUid {
    type Err = ParseOrderUidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = const_hex::decode(s)?;
        Ok(Self::try_from(bytes.as_slice())?)
    }
}

impl Display for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&const_hex::encode_prefixed(self.0))
    }
}

impl fmt::Debug for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl Default for OrderUid {
    fn default() -> Self {
        Self([0u8; ORDER_UID_LENGTH])
    }
}

impl Serialize for OrderUid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for OrderUid {
    fn deserialize<D>(deserializer: D) -> Result<OrderUid, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;
        impl de::Visitor<'_> for Visitor {
            type Value = OrderUid;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "an uid with orderDigest_owner_validTo")
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if !s.starts_with("0x") {
                    return Err(de::Error::custom(format!(
                        "{s:?} can't be decoded as hex uid because it does not start with '0x'"
                    )));
                }
                s.parse().map_err(|err| {
                    de::Error::custom(format!("failed to decode {s:?} as hex uid: {err}"))
                })
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

/// The values an order UID is made of.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct OrderUidParams {
    /// The EIP-712 signing digest of the order.
    pub order_digest: B256,
    pub owner: Address,
    pub valid_to: u32,
}

pub fn pack_order_uid_params(params: &OrderUidParams) -> OrderUid {
    OrderUid::from_parts(params.order_digest, params.owner, params.valid_to)
}

/// Splits raw order UID bytes into their parts. Fails unless the input is
/// exactly [`ORDER_UID_LENGTH`] bytes long.
pub fn extract_order_uid_params(uid: &[u8]) -> Result<OrderUidParams, InvalidOrderUid> {
    let (order_digest, owner, valid_to) = OrderUid::try_from(uid)?.parts();
    Ok(OrderUidParams {
        order_digest,
        owner,
        valid_to,
    })
}

/// Computes the UID of an order signed by `owner`.
pub fn compute_order_uid(
    domain: &DomainSeparator,
    order: &Order,
    owner: Address,
) -> Result<OrderUid, NormalizeError> {
    Ok(order.normalize()?.uid(domain, &owner))
}
