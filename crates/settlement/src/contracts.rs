//! ABI of the settlement contract functions the encoders produce calldata for.
//!
//! <https://github.com/cowprotocol/contracts/blob/v1.1.2/src/contracts/GPv2Settlement.sol>

alloy::sol! {
    library GPv2Trade {
        #[derive(Debug, PartialEq, Eq)]
        struct Data {
            uint256 sellTokenIndex;
            uint256 buyTokenIndex;
            address receiver;
            uint256 sellAmount;
            uint256 buyAmount;
            uint32 validTo;
            bytes32 appData;
            uint256 feeAmount;
            uint256 flags;
            uint256 executedAmount;
            bytes signature;
        }
    }

    library GPv2Interaction {
        #[derive(Debug, PartialEq, Eq)]
        struct Data {
            address target;
            uint256 value;
            bytes callData;
        }
    }

    library IVault {
        #[derive(Debug, PartialEq, Eq)]
        struct BatchSwapStep {
            bytes32 poolId;
            uint256 assetInIndex;
            uint256 assetOutIndex;
            uint256 amount;
            bytes userData;
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    interface GPv2Settlement {
        function settle(
            address[] tokens,
            uint256[] clearingPrices,
            GPv2Trade.Data[] trades,
            GPv2Interaction.Data[][3] interactions
        ) external;

        function swap(
            IVault.BatchSwapStep[] swaps,
            address[] tokens,
            GPv2Trade.Data trade
        ) external;

        function freeFilledAmountStorage(bytes[] orderUids) external;

        function freePreSignatureStorage(bytes[] orderUids) external;
    }
}
