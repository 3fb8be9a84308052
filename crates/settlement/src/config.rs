use {
    alloy::primitives::{Address, address},
    anyhow::Context,
    model::{DOMAIN_NAME, DOMAIN_VERSION, Domain},
    serde::Deserialize,
    std::path::Path,
    tokio::fs,
};

/// Address of the settlement contract on all networks it is deployed to.
pub const SETTLEMENT_CONTRACT: Address = address!("9008D19f58AAbD9eD0D60971565AA8510560ab41");

/// Deployment of the settlement contract that orders are signed for.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub chain_id: u64,

    #[serde(default = "default_settlement_contract")]
    pub settlement_contract: Address,

    #[serde(default = "default_domain_name")]
    pub domain_name: String,

    #[serde(default = "default_domain_version")]
    pub domain_version: String,
}

fn default_settlement_contract() -> Address {
    SETTLEMENT_CONTRACT
}

fn default_domain_name() -> String {
    DOMAIN_NAME.to_string()
}

fn default_domain_version() -> String {
    DOMAIN_VERSION.to_string()
}

impl Config {
    pub fn from_toml(data: &str) -> anyhow::Result<Self> {
        toml::de::from_str(data).context("invalid settlement configuration")
    }

    /// Reads the configuration from a TOML file.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .await
            .with_context(|| format!("I/O error while reading {path:?}"))?;
        Self::from_toml(&data).with_context(|| format!("failed to load {path:?}"))
    }

    /// The EIP-712 domain orders for this deployment are signed in.
    pub fn domain(&self) -> Domain {
        Domain {
            name: Some(self.domain_name.clone()),
            version: Some(self.domain_version.clone()),
            chain_id: Some(self.chain_id),
            verifying_contract: Some(self.settlement_contract),
            salt: None,
        }
    }
}
