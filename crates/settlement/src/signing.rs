use {
    crate::error::{Error, Result},
    alloy::{
        primitives::{Address, B256, Bytes},
        signers::local::PrivateKeySigner,
    },
    model::{
        Domain,
        order::{NormalizedOrder, Order},
        signature::{EcdsaSignature, EcdsaSigningScheme, InvalidSignature, Signature},
    },
};

/// A key that can sign orders. Backends return the raw 65 byte `r ‖ s ‖ v`
/// signature.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TypedDataSigner: Send + Sync {
    fn account(&self) -> Address;

    /// Signs the order as EIP-712 typed data in the given domain.
    async fn sign_typed_data(
        &self,
        domain: &Domain,
        order: &NormalizedOrder,
    ) -> anyhow::Result<Bytes>;

    /// Signs `message` with the EIP-191 `personal_sign` prefix.
    async fn sign_personal_message(&self, message: &[u8]) -> anyhow::Result<Bytes>;
}

#[async_trait::async_trait]
impl TypedDataSigner for PrivateKeySigner {
    fn account(&self) -> Address {
        alloy::signers::Signer::address(self)
    }

    async fn sign_typed_data(
        &self,
        domain: &Domain,
        order: &NormalizedOrder,
    ) -> anyhow::Result<Bytes> {
        let digest = B256::from(order.signing_digest(&domain.separator()));
        let signature = alloy::signers::Signer::sign_hash(self, &digest).await?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    async fn sign_personal_message(&self, message: &[u8]) -> anyhow::Result<Bytes> {
        let signature = alloy::signers::Signer::sign_message(self, message).await?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }
}

/// Signs an order with one of the ECDSA schemes.
///
/// ETHSIGN signs the EIP-712 digest of the order as a personal message.
/// Some signers return a recovery id of 0 or 1 instead of 27 or 28, which is
/// normalized here since the settlement contract only accepts the latter.
/// Any other recovery id is rejected.
pub async fn sign_order<S>(
    domain: &Domain,
    order: &Order,
    signer: &S,
    scheme: EcdsaSigningScheme,
) -> Result<Signature>
where
    S: TypedDataSigner + ?Sized,
{
    let order = order.normalize()?;
    let raw = match scheme {
        EcdsaSigningScheme::Eip712 => signer.sign_typed_data(domain, &order).await,
        EcdsaSigningScheme::EthSign => {
            let digest = order.signing_digest(&domain.separator());
            signer.sign_personal_message(&digest).await
        }
    }
    .map_err(Error::Signing)?;

    let bytes: &[u8; 65] = raw[..]
        .try_into()
        .map_err(|_| InvalidSignature::EcdsaLength(raw.len()))?;
    let mut signature = EcdsaSignature::from_bytes(bytes);
    signature.v = signature.legacy_v()?;
    tracing::debug!(?scheme, "signed order");
    Ok(signature.to_signature(scheme))
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::primitives::{U256, address},
        model::{order::Timestamp, signature::SigningScheme},
    };

    fn order() -> Order {
        Order {
            sell_token: Address::repeat_byte(0x11),
            buy_token: Address::repeat_byte(0x22),
            sell_amount: U256::from(100),
            buy_amount: U256::from(50),
            valid_to: Timestamp::Unix(1000),
            ..Default::default()
        }
    }

    fn raw_signature(v: u8) -> Bytes {
        let mut bytes = vec![0x01; 64];
        bytes.push(v);
        bytes.into()
    }

    #[tokio::test]
    async fn pads_recovery_id() {
        let mut signer = MockTypedDataSigner::new();
        signer
            .expect_sign_typed_data()
            .times(1)
            .returning(|_, _| Ok(raw_signature(1)));
        signer
            .expect_sign_personal_message()
            .times(1)
            .returning(|message| {
                assert_eq!(message.len(), 32);
                Ok(raw_signature(28))
            });

        let domain = Domain::gpv2(1, Address::repeat_byte(0x42));
        let signature = sign_order(&domain, &order(), &signer, EcdsaSigningScheme::Eip712)
            .await
            .unwrap();
        let Signature::Eip712(signature) = signature else {
            panic!("unexpected signature {signature:?}");
        };
        assert_eq!(signature.v, 28);

        let signature = sign_order(&domain, &order(), &signer, EcdsaSigningScheme::EthSign)
            .await
            .unwrap();
        let Signature::EthSign(signature) = signature else {
            panic!("unexpected signature {signature:?}");
        };
        assert_eq!(signature.v, 28);
    }

    #[tokio::test]
    async fn rejects_malformed_signatures() {
        let mut signer = MockTypedDataSigner::new();
        signer
            .expect_sign_typed_data()
            .returning(|_, _| Ok(Bytes::from(vec![0; 64])));
        let result = sign_order(
            &Domain::default(),
            &order(),
            &signer,
            EcdsaSigningScheme::Eip712,
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::InvalidSignature(InvalidSignature::EcdsaLength(64)))
        ));
    }

    #[tokio::test]
    async fn rejects_out_of_range_recovery_ids() {
        for v in [2, 26, 29] {
            let mut signer = MockTypedDataSigner::new();
            signer
                .expect_sign_typed_data()
                .returning(move |_, _| Ok(raw_signature(v)));
            let result = sign_order(
                &Domain::default(),
                &order(),
                &signer,
                EcdsaSigningScheme::Eip712,
            )
            .await;
            assert!(matches!(
                result,
                Err(Error::InvalidSignature(InvalidSignature::RecoveryId(id))) if id == v
            ));
        }
    }

    #[tokio::test]
    async fn propagates_signer_errors() {
        let mut signer = MockTypedDataSigner::new();
        signer
            .expect_sign_personal_message()
            .returning(|_| Err(anyhow::anyhow!("locked")));
        let result = sign_order(
            &Domain::default(),
            &order(),
            &signer,
            EcdsaSigningScheme::EthSign,
        )
        .await;
        assert!(matches!(result, Err(Error::Signing(_))));
    }

    #[tokio::test]
    async fn private_key_signatures_recover_to_signer() {
        // Second default hardhat development account.
        let signer: PrivateKeySigner =
            "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
                .parse()
                .unwrap();
        assert_eq!(
            signer.account(),
            address!("70997970C51812dc3A010C7d01b50e0d17dc79C8")
        );

        let domain = Domain::gpv2(5, address!("9008D19f58AAbD9eD0D60971565AA8510560ab41"));
        let struct_hash = order().normalize().unwrap().hash_struct();
        for scheme in [EcdsaSigningScheme::Eip712, EcdsaSigningScheme::EthSign] {
            let signature = sign_order(&domain, &order(), &signer, scheme)
                .await
                .unwrap();
            assert_eq!(signature.scheme(), SigningScheme::from(scheme));
            assert_eq!(
                signature
                    .owner(&domain.separator(), &struct_hash)
                    .unwrap(),
                signer.account()
            );
        }
    }
}
