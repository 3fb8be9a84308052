use {alloy::primitives::Address, indexmap::IndexSet};

/// Ordered set of the tokens a settlement touches. Trades and swaps refer to
/// tokens by their position in this list.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TokenRegistry {
    tokens: IndexSet<Address>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of the token, appending it if it was not seen
    /// before. Indices are stable for the lifetime of the registry.
    pub fn index(&mut self, token: Address) -> usize {
        let (index, inserted) = self.tokens.insert_full(token);
        if inserted {
            tracing::trace!(?token, index, "registered token");
        }
        index
    }

    pub fn get(&self, index: usize) -> Option<Address> {
        self.tokens.get_index(index).copied()
    }

    /// The registered tokens in insertion order.
    pub fn addresses(&self) -> Vec<Address> {
        self.tokens.iter().copied().collect()
    }

    pub fn into_addresses(self) -> Vec<Address> {
        self.tokens.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
