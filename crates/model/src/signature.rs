use {
    crate::{DomainSeparator, hashed_eip712_message},
    alloy::primitives::{Address, B256, Bytes, U256, keccak256},
    serde::{Deserialize, Serialize, de},
    std::{
        fmt::{self, Debug, Formatter},
        str::FromStr,
    },
};

/// See [`Signature`].
#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SigningScheme {
    #[default]
    Eip712,
    EthSign,
    Eip1271,
    PreSign,
}

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
#[error("unsupported signing scheme {0:?}")]
pub struct UnsupportedSigningScheme(pub String);

impl FromStr for SigningScheme {
    type Err = UnsupportedSigningScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eip712" => Ok(Self::Eip712),
            "ethsign" => Ok(Self::EthSign),
            "eip1271" => Ok(Self::Eip1271),
            "presign" => Ok(Self::PreSign),
            _ => Err(UnsupportedSigningScheme(s.to_string())),
        }
    }
}

impl SigningScheme {
    pub fn is_ecdsa_scheme(&self) -> bool {
        self.try_to_ecdsa_scheme().is_some()
    }

    pub fn try_to_ecdsa_scheme(&self) -> Option<EcdsaSigningScheme> {
        match self {
            Self::Eip712 => Some(EcdsaSigningScheme::Eip712),
            Self::EthSign => Some(EcdsaSigningScheme::EthSign),
            Self::Eip1271 | Self::PreSign => None,
        }
    }
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EcdsaSigningScheme {
    Eip712,
    EthSign,
}

impl From<EcdsaSigningScheme> for SigningScheme {
    fn from(scheme: EcdsaSigningScheme) -> Self {
        match scheme {
            EcdsaSigningScheme::Eip712 => Self::Eip712,
            EcdsaSigningScheme::EthSign => Self::EthSign,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidSignature {
    #[error("ECDSA signature must be 65 bytes long but got {0}")]
    EcdsaLength(usize),
    #[error("EIP-1271 signature must start with a 20 byte verifier but got {0} bytes")]
    MissingVerifier(usize),
    #[error("pre-signature must be a 20 byte owner address but got {0} bytes")]
    PreSignLength(usize),
    #[error("invalid ECDSA recovery id {0}")]
    RecoveryId(u8),
    #[error(transparent)]
    Recovery(#[from] alloy::primitives::SignatureError),
}

/// Signature over the order data.
/// All variants rely on the EIP-712 hash of the order data, referred to as the
/// order hash.
#[derive(Eq, PartialEq, Clone, Deserialize, Serialize, Hash)]
#[serde(into = "JsonSignature", try_from = "JsonSignature")]
pub enum Signature {
    /// The order struct is signed according to EIP-712.
    ///
    /// https://eips.ethereum.org/EIPS/eip-712
    Eip712(EcdsaSignature),
    /// The order hash is signed according to EIP-191's personal_sign signature
    /// format.
    ///
    /// https://eips.ethereum.org/EIPS/eip-191
    EthSign(EcdsaSignature),
    /// Signature verified according to EIP-1271 by calling `verifier`, which
    /// allows smart contracts to place orders. The order hash is passed to the
    /// verification method, along with this signature.
    ///
    /// https://eips.ethereum.org/EIPS/eip-1271
    Eip1271 { verifier: Address, signature: Bytes },
    /// The owner authorized the order with an onchain transaction that sets a
    /// flag for the order UID in the settlement contract. There is no
    /// cryptographic material.
    PreSign(Address),
}

impl Debug for Signature {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let scheme = format!("{:?}", self.scheme());
        f.debug_tuple(&scheme)
            .field(&self.encode_for_settlement())
            .finish()
    }
}

impl Signature {
    pub fn scheme(&self) -> SigningScheme {
        match self {
            Self::Eip712(_) => SigningScheme::Eip712,
            Self::EthSign(_) => SigningScheme::EthSign,
            Self::Eip1271 { .. } => SigningScheme::Eip1271,
            Self::PreSign(_) => SigningScheme::PreSign,
        }
    }

    /// Encodes the signature bytes the way the settlement contract expects
    /// them in a trade.
    pub fn encode_for_settlement(&self) -> Bytes {
        match self {
            Self::Eip712(signature) | Self::EthSign(signature) => {
                Bytes::copy_from_slice(&signature.to_bytes())
            }
            Self::Eip1271 {
                verifier,
                signature,
            } => [verifier.as_slice(), &signature[..]].concat().into(),
            Self::PreSign(owner) => Bytes::copy_from_slice(owner.as_slice()),
        }
    }

    /// Checks that the signature can be encoded for the settlement contract.
    /// ECDSA recovery ids must be 0, 1, 27 or 28.
    pub fn validate(&self) -> Result<(), InvalidSignature> {
        match self {
            Self::Eip712(signature) | Self::EthSign(signature) => {
                signature.legacy_v().map(|_| ())
            }
            Self::Eip1271 { .. } | Self::PreSign(_) => Ok(()),
        }
    }

    /// Inverse of [`Signature::encode_for_settlement`].
    pub fn from_encoded(scheme: SigningScheme, bytes: &[u8]) -> Result<Self, InvalidSignature> {
        Ok(match scheme {
            SigningScheme::Eip712 | SigningScheme::EthSign => {
                let bytes: &[u8; 65] = bytes
                    .try_into()
                    .map_err(|_| InvalidSignature::EcdsaLength(bytes.len()))?;
                let signature = EcdsaSignature::from_bytes(bytes);
                signature.legacy_v()?;
                match scheme {
                    SigningScheme::Eip712 => Self::Eip712(signature),
                    _ => Self::EthSign(signature),
                }
            }
            SigningScheme::Eip1271 => {
                if bytes.len() < 20 {
                    return Err(InvalidSignature::MissingVerifier(bytes.len()));
                }
                Self::Eip1271 {
                    verifier: Address::from_slice(&bytes[..20]),
                    signature: Bytes::copy_from_slice(&bytes[20..]),
                }
            }
            SigningScheme::PreSign => {
                if bytes.len() != 20 {
                    return Err(InvalidSignature::PreSignLength(bytes.len()));
                }
                Self::PreSign(Address::from_slice(bytes))
            }
        })
    }

    /// Returns the owner of the order with the given struct hash. ECDSA
    /// signatures are recovered, the other schemes name the owner directly.
    pub fn owner(
        &self,
        domain_separator: &DomainSeparator,
        struct_hash: &[u8; 32],
    ) -> Result<Address, InvalidSignature> {
        match self {
            Self::Eip712(signature) => {
                signature.recover(EcdsaSigningScheme::Eip712, domain_separator, struct_hash)
            }
            Self::EthSign(signature) => {
                signature.recover(EcdsaSigningScheme::EthSign, domain_separator, struct_hash)
            }
            Self::Eip1271 { verifier, .. } => Ok(*verifier),
            Self::PreSign(owner) => Ok(*owner),
        }
    }
}

/// An internal type used for deriving `serde` implementations for the
/// `Signature` type.
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSignature {
    signing_scheme: SigningScheme,
    signature: Bytes,
}

impl From<Signature> for JsonSignature {
    fn from(signature: Signature) -> Self {
        Self {
            signing_scheme: signature.scheme(),
            signature: signature.encode_for_settlement(),
        }
    }
}

impl TryFrom<JsonSignature> for Signature {
    type Error = InvalidSignature;

    fn try_from(json: JsonSignature) -> Result<Self, Self::Error> {
        Self::from_encoded(json.signing_scheme, &json.signature)
    }
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Hash)]
pub struct EcdsaSignature {
    pub r: B256,
    pub s: B256,
    pub v: u8,
}

/// Returns the message used for signing and recovery for the specified hash.
///
/// The signing message depends on the signature scheme that was used.
pub fn signing_message(
    signing_scheme: EcdsaSigningScheme,
    domain_separator: &DomainSeparator,
    struct_hash: &[u8; 32],
) -> [u8; 32] {
    let message = hashed_eip712_message(domain_separator, struct_hash);
    match signing_scheme {
        EcdsaSigningScheme::Eip712 => message,
        EcdsaSigningScheme::EthSign => ethsign_message(&message),
    }
}

/// EIP-191 `personal_sign` hash of a 32 byte message.
pub fn ethsign_message(message: &[u8; 32]) -> [u8; 32] {
    let mut buffer = [0u8; 60];
    buffer[..28].copy_from_slice(b"\x19Ethereum Signed Message:\n32");
    buffer[28..].copy_from_slice(message);
    keccak256(buffer).0
}

impl EcdsaSignature {
    pub fn to_signature(self, scheme: EcdsaSigningScheme) -> Signature {
        match scheme {
            EcdsaSigningScheme::Eip712 => Signature::Eip712(self),
            EcdsaSigningScheme::EthSign => Signature::EthSign(self),
        }
    }

    /// r + s + v, with v in its legacy 27/28 form. A recovery id that is
    /// neither 0/1 nor 27/28 is kept as is, see [`EcdsaSignature::legacy_v`].
    pub fn to_bytes(self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(self.r.as_slice());
        bytes[32..64].copy_from_slice(self.s.as_slice());
        bytes[64] = self.legacy_v().unwrap_or(self.v);
        bytes
    }

    /// The recovery id as 27 or 28. Fails for anything but 0, 1, 27 and 28.
    pub fn legacy_v(&self) -> Result<u8, InvalidSignature> {
        Ok(27 + u8::from(self.y_parity()?))
    }

    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        EcdsaSignature {
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
            v: bytes[64],
        }
    }

    fn y_parity(&self) -> Result<bool, InvalidSignature> {
        match self.v {
            0 | 27 => Ok(false),
            1 | 28 => Ok(true),
            v => Err(InvalidSignature::RecoveryId(v)),
        }
    }

    pub fn recover(
        &self,
        signing_scheme: EcdsaSigningScheme,
        domain_separator: &DomainSeparator,
        struct_hash: &[u8; 32],
    ) -> Result<Address, InvalidSignature> {
        let message = signing_message(signing_scheme, domain_separator, struct_hash);
        let signature = alloy::primitives::Signature::new(
            U256::from_be_bytes(self.r.0),
            U256::from_be_bytes(self.s.0),
            self.y_parity()?,
        );
        Ok(signature.recover_address_from_prehash(&B256::from(message))?)
    }
}

impl From<alloy::primitives::Signature> for EcdsaSignature {
    fn from(signature: alloy::primitives::Signature) -> Self {
        Self::from_bytes(&signature.as_bytes())
    }
}

impl Serialize for EcdsaSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&const_hex::encode_prefixed(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for EcdsaSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;
        impl de::Visitor<'_> for Visitor {
            type Value = EcdsaSignature;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    formatter,
                    "the 65 ecdsa signature bytes as a hex encoded string, ordered as r, s, v, \
                     where v is either 27 or 28"
                )
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let s = s.strip_prefix("0x").ok_or_else(|| {
                    de::Error::custom(format!(
                        "{s:?} can't be decoded as hex ecdsa signature because it does not start \
                         with '0x'"
                    ))
                })?;
                let bytes: [u8; 65] = const_hex::decode_to_array(s).map_err(|err| {
                    de::Error::custom(format!(
                        "failed to decode {s:?} as hex ecdsa signature: {err}"
                    ))
                })?;
                Ok(EcdsaSignature::from_bytes(&bytes))
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::address, hex_literal::hex, serde_json::json};

    #[test]
    fn onchain_signatures_name_their_owner() {
        let owner = Address::repeat_byte(0x42);
        for signature in [
            Signature::PreSign(owner),
            Signature::Eip1271 {
                verifier: owner,
                signature: Bytes::from(vec![1, 2, 3]),
            },
        ] {
            assert_eq!(
                signature
                    .owner(&Default::default(), &Default::default())
                    .unwrap(),
                owner
            );
        }
    }

    #[test]
    fn onchain_signatures_fail_to_convert_to_ecdsa_signature() {
        for signature in [SigningScheme::PreSign, SigningScheme::Eip1271] {
            assert!(signature.try_to_ecdsa_scheme().is_none());
        }
    }

    #[test]
    fn parses_signing_schemes() {
        assert_eq!("eip712".parse(), Ok(SigningScheme::Eip712));
        assert_eq!("ETHSIGN".parse(), Ok(SigningScheme::EthSign));
        assert_eq!("eip1271".parse(), Ok(SigningScheme::Eip1271));
        assert_eq!("presign".parse(), Ok(SigningScheme::PreSign));
        assert_eq!(
            "eip2612".parse::<SigningScheme>(),
            Err(UnsupportedSigningScheme("eip2612".to_string()))
        );
    }

    #[test]
    fn encodes_for_settlement() {
        let ecdsa = EcdsaSignature {
            r: B256::repeat_byte(1),
            s: B256::repeat_byte(2),
            v: 1,
        };
        let mut expected = [0u8; 65];
        expected[..32].fill(1);
        expected[32..64].fill(2);
        expected[64] = 28;
        assert_eq!(Signature::Eip712(ecdsa).encode_for_settlement()[..], expected);
        assert_eq!(Signature::EthSign(ecdsa).encode_for_settlement()[..], expected);

        let verifier = address!("1111111111111111111111111111111111111111");
        assert_eq!(
            Signature::Eip1271 {
                verifier,
                signature: Bytes::from(vec![0xca, 0xfe]),
            }
            .encode_for_settlement()[..],
            hex!("1111111111111111111111111111111111111111cafe")
        );
        assert_eq!(
            Signature::PreSign(verifier).encode_for_settlement()[..],
            verifier[..]
        );
    }

    #[test]
    fn signature_from_encoded() {
        assert!(Signature::from_encoded(SigningScheme::Eip712, &[0u8; 20]).is_err());
        assert!(Signature::from_encoded(SigningScheme::EthSign, &[0u8; 66]).is_err());
        assert!(Signature::from_encoded(SigningScheme::Eip1271, &[0u8; 19]).is_err());
        assert!(Signature::from_encoded(SigningScheme::PreSign, &[0u8; 32]).is_err());
        assert!(Signature::from_encoded(SigningScheme::PreSign, &[]).is_err());

        assert_eq!(
            Signature::from_encoded(SigningScheme::Eip712, &[0u8; 65]).unwrap(),
            Signature::Eip712(Default::default())
        );
        assert_eq!(
            Signature::from_encoded(SigningScheme::Eip1271, &[0u8; 20]).unwrap(),
            Signature::Eip1271 {
                verifier: Address::ZERO,
                signature: Bytes::new(),
            }
        );
        assert_eq!(
            Signature::from_encoded(SigningScheme::PreSign, &[0x42; 20]).unwrap(),
            Signature::PreSign(Address::repeat_byte(0x42))
        );
    }

    #[test]
    fn ecdsa_scheme_conversion() {
        for ecdsa_scheme in [EcdsaSigningScheme::Eip712, EcdsaSigningScheme::EthSign] {
            let scheme = SigningScheme::from(ecdsa_scheme);
            assert!(scheme.is_ecdsa_scheme())
        }

        for onchain_scheme in [SigningScheme::PreSign, SigningScheme::Eip1271] {
            assert!(!onchain_scheme.is_ecdsa_scheme())
        }
    }

    #[test]
    fn recovery_ids_are_normalized_or_rejected() {
        let signature = |v| EcdsaSignature {
            r: B256::repeat_byte(1),
            s: B256::repeat_byte(2),
            v,
        };
        for (v, legacy) in [(0, 27), (1, 28), (27, 27), (28, 28)] {
            assert_eq!(signature(v).legacy_v().unwrap(), legacy);
            assert_eq!(Signature::Eip712(signature(v)).encode_for_settlement()[64], legacy);
            assert!(Signature::EthSign(signature(v)).validate().is_ok());
        }
        for v in [2, 5, 26, 29, 255] {
            assert!(matches!(
                signature(v).legacy_v(),
                Err(InvalidSignature::RecoveryId(id)) if id == v
            ));
            assert!(matches!(
                Signature::Eip712(signature(v)).validate(),
                Err(InvalidSignature::RecoveryId(id)) if id == v
            ));

            let mut bytes = [0u8; 65];
            bytes[64] = v;
            assert!(matches!(
                Signature::from_encoded(SigningScheme::EthSign, &bytes),
                Err(InvalidSignature::RecoveryId(id)) if id == v
            ));
        }
        assert!(Signature::PreSign(Address::ZERO).validate().is_ok());
    }

    #[test]
    fn rejects_invalid_recovery_ids() {
        let signature = EcdsaSignature {
            r: B256::repeat_byte(1),
            s: B256::repeat_byte(2),
            v: 5,
        };
        assert!(matches!(
            signature.recover(
                EcdsaSigningScheme::Eip712,
                &Default::default(),
                &Default::default()
            ),
            Err(InvalidSignature::RecoveryId(5))
        ));
    }

    #[test]
    fn deserialize_and_back() {
        for (signature, json) in [
            (
                Signature::Eip712(EcdsaSignature {
                    v: 27,
                    ..Default::default()
                }),
                json!({
                    "signingScheme": "eip712",
                    "signature": "0x\
                        0000000000000000000000000000000000000000000000000000000000000000\
                        0000000000000000000000000000000000000000000000000000000000000000\
                        1b",
                }),
            ),
            (
                Signature::EthSign(EcdsaSignature {
                    r: B256::repeat_byte(1),
                    s: B256::repeat_byte(2),
                    v: 28,
                }),
                json!({
                    "signingScheme": "ethsign",
                    "signature": "0x\
                        0101010101010101010101010101010101010101010101010101010101010101\
                        0202020202020202020202020202020202020202020202020202020202020202\
                        1c",
                }),
            ),
            (
                Signature::Eip1271 {
                    verifier: Address::repeat_byte(0x0f),
                    signature: Bytes::from(vec![1, 2, 3]),
                },
                json!({
                    "signingScheme": "eip1271",
                    "signature": "0x0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f010203",
                }),
            ),
            (
                Signature::PreSign(Address::repeat_byte(0x0f)),
                json!({
                    "signingScheme": "presign",
                    "signature": "0x0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f",
                }),
            ),
        ] {
            assert_eq!(signature, serde_json::from_value(json.clone()).unwrap());
            assert_eq!(json, json!(signature));
        }
    }

    #[test]
    fn deserialization_errors() {
        for json in [
            json!({
                "signingScheme": "eip712",
                "signature": "0x0102",
            }),
            json!({
                "signingScheme": "ethsign",
                "signature": 1234,
            }),
            json!({
                "signingScheme": "eip1271",
            }),
            json!({
                "signingScheme": "presign",
                "signature": "0x01",
            }),
            json!({
                "signingScheme": "eip2612",
                "signature": "0x",
            }),
        ] {
            assert!(serde_json::from_value::<Signature>(json).is_err());
        }
    }

    #[test]
    fn ecdsa_signature_json() {
        let signature = EcdsaSignature {
            r: B256::repeat_byte(1),
            s: B256::repeat_byte(2),
            v: 27,
        };
        let value = json!(signature);
        assert_eq!(
            value,
            json!(
                "0x\
                 0101010101010101010101010101010101010101010101010101010101010101\
                 0202020202020202020202020202020202020202020202020202020202020202\
                 1b"
            )
        );
        assert_eq!(
            serde_json::from_value::<EcdsaSignature>(value).unwrap(),
            signature
        );
    }
}
