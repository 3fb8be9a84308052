//! Bit packing of the order and trade flags of settlement trades.
//!
//! | bits | field              | options                                   |
//! |------|--------------------|-------------------------------------------|
//! | 0    | kind               | sell, buy                                 |
//! | 1    | partially fillable | false, true                               |
//! | 2-3  | sell token balance | erc20, erc20 (legacy), external, internal |
//! | 4    | buy token balance  | erc20, internal                           |
//! | 5-6  | signing scheme     | eip712, ethsign, eip1271, presign         |

use {
    crate::{
        order::{NormalizedOrder, OrderBalance, OrderKind, normalize_buy_token_balance},
        signature::SigningScheme,
    },
    alloy::primitives::U256,
};

/// Mask of all bits that carry a flag.
const ALL_FLAGS: u8 = 0b111_1111;

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
#[error("invalid {field} flag in {flags:#x}")]
pub struct InvalidFlags {
    pub field: &'static str,
    pub flags: U256,
}

/// A single flag field: its bit offset and the values its bits index into.
trait Flag: Copy + PartialEq + Sized + 'static {
    const NAME: &'static str;
    const OFFSET: u8;
    const OPTIONS: &'static [Self];

    /// The smallest mask that can represent every option index.
    fn mask() -> u8 {
        let max_index = Self::OPTIONS.len() - 1;
        let bits = usize::BITS - max_index.leading_zeros();
        ((1u16 << bits) - 1) as u8
    }

    fn encode(self) -> u8 {
        let index = Self::OPTIONS
            .iter()
            .position(|option| *option == self)
            .expect("every flag value has an option slot");
        (index as u8) << Self::OFFSET
    }

    fn decode(bits: u8) -> Option<Self> {
        let index = (bits >> Self::OFFSET) & Self::mask();
        Self::OPTIONS.get(usize::from(index)).copied()
    }
}

impl Flag for OrderKind {
    const NAME: &'static str = "kind";
    const OFFSET: u8 = 0;
    const OPTIONS: &'static [Self] = &[Self::Sell, Self::Buy];
}

impl Flag for bool {
    const NAME: &'static str = "partiallyFillable";
    const OFFSET: u8 = 1;
    const OPTIONS: &'static [Self] = &[false, true];
}

/// Sell token balance. Slot 1 is unused by the encoder and decodes to ERC20
/// like the settlement contract does.
#[derive(Clone, Copy, PartialEq)]
struct SellTokenBalance(OrderBalance);

impl Flag for SellTokenBalance {
    const NAME: &'static str = "sellTokenBalance";
    const OFFSET: u8 = 2;
    const OPTIONS: &'static [Self] = &[
        Self(OrderBalance::Erc20),
        Self(OrderBalance::Erc20),
        Self(OrderBalance::External),
        Self(OrderBalance::Internal),
    ];
}

#[derive(Clone, Copy, PartialEq)]
struct BuyTokenBalance(OrderBalance);

impl Flag for BuyTokenBalance {
    const NAME: &'static str = "buyTokenBalance";
    const OFFSET: u8 = 4;
    const OPTIONS: &'static [Self] = &[Self(OrderBalance::Erc20), Self(OrderBalance::Internal)];
}

impl Flag for SigningScheme {
    const NAME: &'static str = "signingScheme";
    const OFFSET: u8 = 5;
    const OPTIONS: &'static [Self] = &[
        Self::Eip712,
        Self::EthSign,
        Self::Eip1271,
        Self::PreSign,
    ];
}

/// The flag bits of the wire value. Bits above the defined fields are
/// ignored, as the settlement contract does.
fn flag_bits(flags: U256) -> u8 {
    (flags & U256::from(ALL_FLAGS)).to::<u8>()
}

fn decode_flag<T: Flag>(flags: U256, bits: u8) -> Result<T, InvalidFlags> {
    T::decode(bits).ok_or(InvalidFlags {
        field: T::NAME,
        flags,
    })
}

/// The order parameters that are packed into the flags of a trade.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OrderFlags {
    pub kind: OrderKind,
    pub partially_fillable: bool,
    pub sell_token_balance: OrderBalance,
    pub buy_token_balance: OrderBalance,
}

impl OrderFlags {
    pub fn encode(&self) -> U256 {
        U256::from(self.bits())
    }

    fn bits(&self) -> u8 {
        self.kind.encode()
            | self.partially_fillable.encode()
            | SellTokenBalance(self.sell_token_balance).encode()
            | BuyTokenBalance(normalize_buy_token_balance(Some(self.buy_token_balance))).encode()
    }

    pub fn decode(flags: U256) -> Result<Self, InvalidFlags> {
        let bits = flag_bits(flags);
        Ok(Self {
            kind: decode_flag(flags, bits)?,
            partially_fillable: decode_flag(flags, bits)?,
            sell_token_balance: decode_flag::<SellTokenBalance>(flags, bits)?.0,
            buy_token_balance: decode_flag::<BuyTokenBalance>(flags, bits)?.0,
        })
    }
}

impl From<&NormalizedOrder> for OrderFlags {
    fn from(order: &NormalizedOrder) -> Self {
        Self {
            kind: order.kind,
            partially_fillable: order.partially_fillable,
            sell_token_balance: order.sell_token_balance,
            buy_token_balance: order.buy_token_balance,
        }
    }
}

/// Order flags plus the scheme the trade's signature uses.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TradeFlags {
    pub order: OrderFlags,
    pub signing_scheme: SigningScheme,
}

impl TradeFlags {
    pub fn encode(&self) -> U256 {
        U256::from(self.order.bits() | self.signing_scheme.encode())
    }

    pub fn decode(flags: U256) -> Result<Self, InvalidFlags> {
        let bits = flag_bits(flags);
        Ok(Self {
            order: OrderFlags::decode(flags)?,
            signing_scheme: decode_flag(flags, bits)?,
        })
    }
}

pub fn encode_signing_scheme(scheme: SigningScheme) -> U256 {
    U256::from(scheme.encode())
}

pub fn decode_signing_scheme(flags: U256) -> Result<SigningScheme, InvalidFlags> {
    decode_flag(flags, flag_bits(flags))
}
