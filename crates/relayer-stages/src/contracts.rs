//! Calldata encoding for the two contract calls the relayer itself originates.
//! Kept to exactly the functions this crate calls — not a full ABI binding.

use alloy_sol_types::sol;

sol! {
    interface IBridge {
        function receiveMessage(bytes calldata payload) external;
    }

    interface IVaultController {
        function updateWithdrawalState(
            bytes32[] calldata messageHashes,
            uint256 l1BatchNumber,
            uint256 totalShares
        ) external;
    }
}
