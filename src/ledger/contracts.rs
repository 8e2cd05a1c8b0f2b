// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Contract bindings for `FileManager` and `UserManager`.

use alloy::sol;

use super::{FileId, LedgerError};

// Define the contract interfaces using alloy's sol! macro
sol! {
    #[sol(rpc)]
    interface IFileManager {
        function uploadFile(string calldata cid) external returns (uint256 fileId);
        function grantAccess(uint256 fileId, address user) external;
        function revokeAccess(uint256 fileId, address user) external;
        function canAccess(uint256 fileId, address user) external view returns (bool);
        function getFile(uint256 fileId) external view returns (string memory cid, address owner, address[] memory grantedAddresses);
        function getFileCID(uint256 fileId, address requester) external view returns (string memory);
        function getMyFiles() external view returns (uint256[] memory);
    }
}

sol! {
    #[sol(rpc)]
    interface IUserManager {
        function registerUser() external;
        function isRegistered(address user) external view returns (bool);
    }
}

/// Revert reason emitted by `FileManager` for non-owner mutations.
pub const REVERT_NOT_OWNER: &str = "Not file owner";

/// Revert reason emitted by `FileManager` for unauthorized CID reads.
pub const REVERT_ACCESS_DENIED: &str = "Access denied";

/// Revert reason emitted by `UserManager` on re-registration.
pub const REVERT_ALREADY_REGISTERED: &str = "Already registered";

/// Map a contract/RPC error message to a typed ledger error.
///
/// Nodes embed the revert string in different envelopes
/// ("execution reverted: ...", JSON-RPC error code 3, ...), so matching is
/// by substring.
pub fn classify_revert(
    message: &str,
    file_id: Option<FileId>,
    caller: Option<alloy::primitives::Address>,
) -> LedgerError {
    if let Some(id) = file_id {
        if message.contains(REVERT_NOT_OWNER) {
            return LedgerError::NotFileOwner(id);
        }
        if message.contains(REVERT_ACCESS_DENIED) {
            return LedgerError::AccessDenied(id);
        }
        if message.contains("Invalid file") || message.contains("File does not exist") {
            return LedgerError::FileNotFound(id);
        }
    }

    if let Some(addr) = caller {
        if message.contains(REVERT_ALREADY_REGISTERED) {
            return LedgerError::AlreadyRegistered(addr);
        }
    }

    if message.contains("revert") {
        LedgerError::TransactionFailed(message.to_string())
    } else {
        LedgerError::RpcError(message.to_string())
    }
}
