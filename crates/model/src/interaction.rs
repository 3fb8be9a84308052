use {
    alloy::primitives::{Address, Bytes, U256},
    number::serialization::HexOrDecimalU256,
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
};

/// An arbitrary call the settlement contract executes during a settlement.
#[serde_as]
#[derive(Eq, PartialEq, Clone, Hash, Default, Deserialize, Serialize, derive_more::Debug)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub target: Address,
    #[serde_as(as = "HexOrDecimalU256")]
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    #[debug("{call_data}")]
    pub call_data: Bytes,
}

impl Interaction {
    /// An interaction calling `target` without value or calldata.
    pub fn new(target: Address) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    pub fn with_value(self, value: U256) -> Self {
        Self { value, ..self }
    }

    pub fn with_call_data(self, call_data: impl Into<Bytes>) -> Self {
        Self {
            call_data: call_data.into(),
            ..self
        }
    }
}

/// When an interaction runs relative to the token transfers of a settlement.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionStage {
    /// Before any sell amounts are transferred in.
    Pre = 0,
    /// After sell amounts are transferred in and before buy amounts are paid
    /// out.
    #[default]
    Intra = 1,
    /// After all buy amounts were paid out.
    Post = 2,
}

impl InteractionStage {
    pub const ALL: [Self; 3] = [Self::Pre, Self::Intra, Self::Post];

    /// Position of the stage in the settlement's interaction lists.
    pub fn index(self) -> usize {
        self as usize
    }
}
