// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM ledger client for the `FileManager` / `UserManager` contracts.

use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use alloy::{
    network::EthereumWallet,
    primitives::{Address, U256},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;

use super::contracts::{classify_revert, IFileManager, IUserManager};
use super::{FileId, Ledger, LedgerError, LedgerFileEntry, LedgerResult};

/// Default maximum wait for a transaction receipt.
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`EvmLedger`].
#[derive(Clone)]
pub struct EvmLedgerConfig {
    /// JSON-RPC endpoint URL
    pub rpc_url: String,
    /// Expected chain ID
    pub chain_id: u64,
    pub file_manager: String,
    pub user_manager: String,
    /// Hex private keys the relay may sign with, one per acting wallet
    pub signer_keys: Vec<String>,
    /// Maximum wait for a receipt before surfacing a timeout
    pub confirm_timeout: Duration,
}

impl std::fmt::Debug for EvmLedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmLedgerConfig")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("file_manager", &self.file_manager)
            .field("user_manager", &self.user_manager)
            .field("signers", &self.signer_keys.len())
            .field("confirm_timeout", &self.confirm_timeout)
            .finish()
    }
}

/// Ledger backed by a live EVM chain.
pub struct EvmLedger {
    provider: DynProvider,
    file_manager: IFileManager::IFileManagerInstance<DynProvider>,
    user_manager: IUserManager::IUserManagerInstance<DynProvider>,
    signers: HashSet<Address>,
    confirm_timeout: Duration,
    chain_id: u64,
}

/// Create a signer from a private key (hex string, optional 0x prefix).
pub fn create_signer(private_key_hex: &str) -> Result<PrivateKeySigner, LedgerError> {
    let key_bytes = alloy::hex::decode(private_key_hex.trim())
        .map_err(|e| LedgerError::InvalidPrivateKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| LedgerError::InvalidPrivateKey(e.to_string()))
}

/// Parse an Ethereum address.
pub fn parse_address(address: &str) -> Result<Address, LedgerError> {
    Address::from_str(address).map_err(|e| LedgerError::InvalidAddress(e.to_string()))
}

fn to_file_id(value: U256) -> LedgerResult<FileId> {
    u64::try_from(value)
        .map_err(|_| LedgerError::RpcError(format!("file id {value} does not fit in u64")))
}

impl EvmLedger {
    /// Connect to the configured chain with every configured relay signer.
    pub fn new(config: EvmLedgerConfig) -> Result<Self, LedgerError> {
        let url: url::Url = config
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| LedgerError::InvalidRpcUrl(e.to_string()))?;

        let mut keys = config.signer_keys.iter();
        let first = keys
            .next()
            .ok_or_else(|| LedgerError::InvalidPrivateKey("no relay signer configured".into()))?;
        let first = create_signer(first)?;

        let mut signers = HashSet::from([first.address()]);
        let mut wallet = EthereumWallet::from(first);
        for key in keys {
            let signer = create_signer(key)?;
            signers.insert(signer.address());
            wallet.register_signer(signer);
        }

        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(url)
            .erased();

        let file_manager = IFileManager::new(parse_address(&config.file_manager)?, provider.clone());
        let user_manager = IUserManager::new(parse_address(&config.user_manager)?, provider.clone());

        tracing::info!(
            chain_id = config.chain_id,
            signers = signers.len(),
            "EVM ledger client configured"
        );

        Ok(Self {
            provider,
            file_manager,
            user_manager,
            signers,
            confirm_timeout: config.confirm_timeout,
            chain_id: config.chain_id,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn ensure_signer(&self, caller: Address) -> LedgerResult<()> {
        if self.signers.contains(&caller) {
            Ok(())
        } else {
            Err(LedgerError::NoSigner(caller))
        }
    }

    /// Wait for a submitted transaction and fail on revert or timeout.
    async fn confirm(&self, pending: PendingTransactionBuilder<alloy::network::Ethereum>) -> LedgerResult<()> {
        let tx_hash = format!("{:#x}", pending.tx_hash());
        tracing::debug!(tx_hash = %tx_hash, "Transaction submitted, waiting for receipt");

        let receipt = tokio::time::timeout(self.confirm_timeout, pending.get_receipt())
            .await
            .map_err(|_| LedgerError::TransactionTimeout {
                tx_hash: tx_hash.clone(),
                waited_secs: self.confirm_timeout.as_secs(),
            })?
            .map_err(|e| LedgerError::TransactionFailed(format!("{tx_hash}: {e}")))?;

        if !receipt.status() {
            return Err(LedgerError::TransactionFailed(format!(
                "{tx_hash} reverted in block {}",
                receipt.block_number.unwrap_or(0)
            )));
        }

        tracing::info!(
            tx_hash = %tx_hash,
            block_number = receipt.block_number.unwrap_or(0),
            gas_used = receipt.gas_used,
            "Transaction confirmed"
        );
        Ok(())
    }
}

#[async_trait]
impl Ledger for EvmLedger {
    fn mode(&self) -> &str {
        "evm"
    }

    async fn head(&self) -> LedgerResult<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| LedgerError::RpcError(e.to_string()))
    }

    async fn register_user(&self, caller: Address) -> LedgerResult<()> {
        self.ensure_signer(caller)?;
        let pending = self
            .user_manager
            .registerUser()
            .from(caller)
            .send()
            .await
            .map_err(|e| classify_revert(&e.to_string(), None, Some(caller)))?;
        self.confirm(pending).await
    }

    async fn is_registered(&self, address: Address) -> LedgerResult<bool> {
        self.user_manager
            .isRegistered(address)
            .call()
            .await
            .map_err(|e| LedgerError::RpcError(e.to_string()))
    }

    async fn record_file(&self, owner: Address, cid: &str) -> LedgerResult<FileId> {
        self.ensure_signer(owner)?;
        let pending = self
            .file_manager
            .uploadFile(cid.to_string())
            .from(owner)
            .send()
            .await
            .map_err(|e| classify_revert(&e.to_string(), None, Some(owner)))?;
        self.confirm(pending).await?;

        // Transaction return values are not observable off-chain; the newest
        // matching entry in the owner's index is the one just anchored.
        let owned = self.files_owned_by(owner).await?;
        for file_id in owned.into_iter().rev() {
            if self.file(file_id).await?.cid == cid {
                return Ok(file_id);
            }
        }

        Err(LedgerError::TransactionFailed(format!(
            "confirmed upload of {cid} not found in owner index"
        )))
    }

    async fn grant_access(
        &self,
        caller: Address,
        file_id: FileId,
        grantee: Address,
    ) -> LedgerResult<()> {
        self.ensure_signer(caller)?;
        let pending = self
            .file_manager
            .grantAccess(U256::from(file_id), grantee)
            .from(caller)
            .send()
            .await
            .map_err(|e| classify_revert(&e.to_string(), Some(file_id), None))?;
        self.confirm(pending).await
    }

    async fn revoke_access(
        &self,
        caller: Address,
        file_id: FileId,
        grantee: Address,
    ) -> LedgerResult<()> {
        self.ensure_signer(caller)?;
        let pending = self
            .file_manager
            .revokeAccess(U256::from(file_id), grantee)
            .from(caller)
            .send()
            .await
            .map_err(|e| classify_revert(&e.to_string(), Some(file_id), None))?;
        self.confirm(pending).await
    }

    async fn can_access(&self, file_id: FileId, address: Address) -> LedgerResult<bool> {
        self.file_manager
            .canAccess(U256::from(file_id), address)
            .call()
            .await
            .map_err(|e| classify_revert(&e.to_string(), Some(file_id), None))
    }

    async fn access_list(&self, file_id: FileId) -> LedgerResult<Vec<Address>> {
        Ok(self.file(file_id).await?.granted)
    }

    async fn file_cid(&self, file_id: FileId, requester: Address) -> LedgerResult<String> {
        self.file_manager
            .getFileCID(U256::from(file_id), requester)
            .from(requester)
            .call()
            .await
            .map_err(|e| classify_revert(&e.to_string(), Some(file_id), None))
    }

    async fn file(&self, file_id: FileId) -> LedgerResult<LedgerFileEntry> {
        let entry = self
            .file_manager
            .getFile(U256::from(file_id))
            .call()
            .await
            .map_err(|e| classify_revert(&e.to_string(), Some(file_id), None))?;

        if entry.owner == Address::ZERO {
            return Err(LedgerError::FileNotFound(file_id));
        }

        Ok(LedgerFileEntry {
            file_id,
            cid: entry.cid,
            owner: entry.owner,
            granted: entry.grantedAddresses,
        })
    }

    async fn files_owned_by(&self, owner: Address) -> LedgerResult<Vec<FileId>> {
        let ids = self
            .file_manager
            .getMyFiles()
            .from(owner)
            .call()
            .await
            .map_err(|e| LedgerError::RpcError(e.to_string()))?;

        ids.into_iter().map(to_file_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Anvil/Hardhat default account #0; public test key.
    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn config() -> EvmLedgerConfig {
        EvmLedgerConfig {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 31337,
            file_manager: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            user_manager: "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512".to_string(),
            signer_keys: vec![TEST_KEY.to_string()],
            confirm_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn create_signer_derives_address() {
        let signer = create_signer(TEST_KEY).unwrap();
        assert_eq!(signer.address(), parse_address(TEST_ADDRESS).unwrap());

        let prefixed = create_signer(&format!("0x{TEST_KEY}")).unwrap();
        assert_eq!(prefixed.address(), signer.address());
    }

    #[test]
    fn create_signer_rejects_garbage() {
        assert!(matches!(
            create_signer("zz"),
            Err(LedgerError::InvalidPrivateKey(_))
        ));
    }

    #[tokio::test]
    async fn new_registers_configured_signers() {
        let ledger = EvmLedger::new(config()).unwrap();
        assert_eq!(ledger.chain_id(), 31337);
        assert!(ledger.ensure_signer(parse_address(TEST_ADDRESS).unwrap()).is_ok());
        assert!(matches!(
            ledger.ensure_signer(Address::repeat_byte(0x11)),
            Err(LedgerError::NoSigner(_))
        ));
    }

    #[tokio::test]
    async fn writes_for_unknown_wallet_fail_before_rpc() {
        let ledger = EvmLedger::new(config()).unwrap();
        let stranger = Address::repeat_byte(0x22);
        assert!(matches!(
            ledger.record_file(stranger, "bafy1234").await,
            Err(LedgerError::NoSigner(a)) if a == stranger
        ));
    }

    #[test]
    fn new_requires_a_signer() {
        let mut cfg = config();
        cfg.signer_keys.clear();
        assert!(matches!(
            EvmLedger::new(cfg),
            Err(LedgerError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn new_rejects_bad_urls_and_addresses() {
        let mut cfg = config();
        cfg.rpc_url = "not a url".to_string();
        assert!(matches!(EvmLedger::new(cfg), Err(LedgerError::InvalidRpcUrl(_))));

        let mut cfg = config();
        cfg.file_manager = "0x1234".to_string();
        assert!(matches!(EvmLedger::new(cfg), Err(LedgerError::InvalidAddress(_))));
    }

    #[test]
    fn file_ids_convert_from_u256() {
        assert_eq!(to_file_id(U256::from(7u64)).unwrap(), 7);
        assert!(to_file_id(U256::MAX).is_err());
    }
}
