//! Data model of the settlement contract: orders, their EIP-712 hashes and
//! unique identifiers, trade flags, signatures and interactions.

pub mod flags;
pub mod interaction;
pub mod order;
pub mod order_uid;
pub mod signature;

use {
    alloy::{
        primitives::{Address, B256, U256, keccak256},
        sol_types::Eip712Domain,
    },
    serde::{Deserialize, Serialize},
    std::{borrow::Cow, fmt},
};

/// The EIP-712 domain name of the settlement contract.
pub const DOMAIN_NAME: &str = "Gnosis Protocol";

/// The EIP-712 domain version of the settlement contract.
pub const DOMAIN_VERSION: &str = "v2";

/// An EIP-712 typed data domain. All fields are optional and only the ones
/// that are set take part in the domain separator.
///
/// The settlement contract address is only known through the
/// `verifying_contract` of the domain, which is why encoding order refunds
/// requires it to be set.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<B256>,
}

impl Domain {
    /// The domain of a settlement contract deployment.
    pub fn gpv2(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: Some(DOMAIN_NAME.to_string()),
            version: Some(DOMAIN_VERSION.to_string()),
            chain_id: Some(chain_id),
            verifying_contract: Some(verifying_contract),
            salt: None,
        }
    }

    pub fn to_eip712(&self) -> Eip712Domain {
        Eip712Domain::new(
            self.name.clone().map(Cow::Owned),
            self.version.clone().map(Cow::Owned),
            self.chain_id.map(U256::from),
            self.verifying_contract,
            self.salt,
        )
    }

    pub fn separator(&self) -> DomainSeparator {
        DomainSeparator(self.to_eip712().separator().0)
    }
}

#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct DomainSeparator(pub [u8; 32]);

impl std::str::FromStr for DomainSeparator {
    type Err = const_hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(const_hex::decode_to_array(s)?))
    }
}

impl fmt::Debug for DomainSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&const_hex::encode(self.0))
    }
}

impl From<&Domain> for DomainSeparator {
    fn from(domain: &Domain) -> Self {
        domain.separator()
    }
}

/// Returns the EIP-712 signing digest `keccak256(0x1901 ‖ domain ‖ struct)`.
///
/// https://eips.ethereum.org/EIPS/eip-712#specification
pub fn hashed_eip712_message(
    domain_separator: &DomainSeparator,
    struct_hash: &[u8; 32],
) -> [u8; 32] {
    let mut message = [0u8; 66];
    message[0..2].copy_from_slice(&[0x19, 0x01]);
    message[2..34].copy_from_slice(&domain_separator.0);
    message[34..66].copy_from_slice(struct_hash);
    keccak256(message).0
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::address, hex_literal::hex, std::str::FromStr};

    #[test]
    fn domain_separator_goerli() {
        let contract_address = address!("9008D19f58AAbD9eD0D60971565AA8510560ab41");
        let domain = Domain::gpv2(5, contract_address);
        // domain separator is taken from Goerli deployment at address
        // 0x9008D19f58AAbD9eD0D60971565AA8510560ab41
        // https://goerli.etherscan.io/address/0x9008D19f58AAbD9eD0D60971565AA8510560ab41#readContract
        let expected = DomainSeparator(hex!(
            "fb378b35457022ecc5709ae5dafad9393c1387ae6d8ce24913a0c969074c07fb"
        ));
        assert_eq!(domain.separator(), expected);
    }

    #[test]
    fn partial_domains_hash_only_present_fields() {
        let name_only = Domain {
            name: Some("unused".to_string()),
            ..Default::default()
        };
        assert_ne!(name_only.separator(), Domain::default().separator());
        assert_ne!(
            name_only.separator(),
            Domain {
                version: Some("unused".to_string()),
                ..Default::default()
            }
            .separator()
        );
    }

    #[test]
    fn domain_separator_from_str() {
        let separator = DomainSeparator::from_str(
            "0xfb378b35457022ecc5709ae5dafad9393c1387ae6d8ce24913a0c969074c07fb",
        )
        .unwrap();
        assert_eq!(
            separator.0,
            hex!("fb378b35457022ecc5709ae5dafad9393c1387ae6d8ce24913a0c969074c07fb")
        );
        assert!(DomainSeparator::from_str("0x01").is_err());
    }

    #[test]
    fn domain_serialization() {
        let domain = Domain::gpv2(1, Address::repeat_byte(0x42));
        let json = serde_json::to_value(&domain).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Gnosis Protocol",
                "version": "v2",
                "chainId": 1,
                "verifyingContract": "0x4242424242424242424242424242424242424242",
            })
        );
        assert_eq!(serde_json::from_value::<Domain>(json).unwrap(), domain);
    }

    #[test]
    fn domain_separator_does_not_panic_in_debug() {
        println!("{:?}", DomainSeparator::default());
    }
}
