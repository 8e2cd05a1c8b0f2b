// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process ledger with the same rules as the deployed contracts.
//!
//! Used for development without a chain and for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use alloy::primitives::Address;
use async_trait::async_trait;

use super::{FileId, Ledger, LedgerError, LedgerFileEntry, LedgerResult};

#[derive(Default)]
struct State {
    users: HashSet<Address>,
    files: HashMap<FileId, LedgerFileEntry>,
    owned: HashMap<Address, Vec<FileId>>,
    next_file_id: FileId,
    writes: u64,
}

/// Ledger held in memory.
pub struct InMemoryLedger {
    state: Mutex<State>,
    reverting: AtomicBool,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::with_next_file_id(1)
    }

    /// Start numbering files at `next` instead of 1.
    pub fn with_next_file_id(next: FileId) -> Self {
        Self {
            state: Mutex::new(State {
                next_file_id: next,
                ..State::default()
            }),
            reverting: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail as a reverted transaction.
    pub fn set_reverting(&self, reverting: bool) {
        self.reverting.store(reverting, Ordering::SeqCst);
    }

    fn lock(&self) -> LedgerResult<std::sync::MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| LedgerError::RpcError("ledger state poisoned".into()))
    }

    fn check_reverting(&self) -> LedgerResult<()> {
        if self.reverting.load(Ordering::SeqCst) {
            Err(LedgerError::TransactionFailed(
                "execution reverted".into(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    fn mode(&self) -> &str {
        "in-memory"
    }

    async fn head(&self) -> LedgerResult<u64> {
        Ok(self.lock()?.writes)
    }

    async fn register_user(&self, caller: Address) -> LedgerResult<()> {
        self.check_reverting()?;
        let mut state = self.lock()?;
        if !state.users.insert(caller) {
            return Err(LedgerError::AlreadyRegistered(caller));
        }
        state.writes += 1;
        Ok(())
    }

    async fn is_registered(&self, address: Address) -> LedgerResult<bool> {
        Ok(self.lock()?.users.contains(&address))
    }

    async fn record_file(&self, owner: Address, cid: &str) -> LedgerResult<FileId> {
        self.check_reverting()?;
        let mut state = self.lock()?;
        let file_id = state.next_file_id;
        state.next_file_id += 1;
        state.files.insert(
            file_id,
            LedgerFileEntry {
                file_id,
                cid: cid.to_string(),
                owner,
                granted: Vec::new(),
            },
        );
        state.owned.entry(owner).or_default().push(file_id);
        state.writes += 1;
        Ok(file_id)
    }

    async fn grant_access(
        &self,
        caller: Address,
        file_id: FileId,
        grantee: Address,
    ) -> LedgerResult<()> {
        self.check_reverting()?;
        let mut state = self.lock()?;
        let entry = state
            .files
            .get_mut(&file_id)
            .ok_or(LedgerError::FileNotFound(file_id))?;
        if entry.owner != caller {
            return Err(LedgerError::NotFileOwner(file_id));
        }
        if !entry.granted.contains(&grantee) {
            entry.granted.push(grantee);
        }
        state.writes += 1;
        Ok(())
    }

    async fn revoke_access(
        &self,
        caller: Address,
        file_id: FileId,
        grantee: Address,
    ) -> LedgerResult<()> {
        self.check_reverting()?;
        let mut state = self.lock()?;
        let entry = state
            .files
            .get_mut(&file_id)
            .ok_or(LedgerError::FileNotFound(file_id))?;
        if entry.owner != caller {
            return Err(LedgerError::NotFileOwner(file_id));
        }
        entry.granted.retain(|a| *a != grantee);
        state.writes += 1;
        Ok(())
    }

    async fn can_access(&self, file_id: FileId, address: Address) -> LedgerResult<bool> {
        let state = self.lock()?;
        let entry = state
            .files
            .get(&file_id)
            .ok_or(LedgerError::FileNotFound(file_id))?;
        Ok(entry.owner == address || entry.granted.contains(&address))
    }

    async fn access_list(&self, file_id: FileId) -> LedgerResult<Vec<Address>> {
        Ok(self.file(file_id).await?.granted)
    }

    async fn file_cid(&self, file_id: FileId, requester: Address) -> LedgerResult<String> {
        let entry = self.file(file_id).await?;
        if entry.owner == requester || entry.granted.contains(&requester) {
            Ok(entry.cid)
        } else {
            Err(LedgerError::AccessDenied(file_id))
        }
    }

    async fn file(&self, file_id: FileId) -> LedgerResult<LedgerFileEntry> {
        self.lock()?
            .files
            .get(&file_id)
            .cloned()
            .ok_or(LedgerError::FileNotFound(file_id))
    }

    async fn files_owned_by(&self, owner: Address) -> LedgerResult<Vec<FileId>> {
        Ok(self.lock()?.owned.get(&owner).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::repeat_byte(0xa1);
    const BOB: Address = Address::repeat_byte(0xb0);
    const CAROL: Address = Address::repeat_byte(0xc0);

    #[tokio::test]
    async fn registration_is_one_shot() {
        let ledger = InMemoryLedger::new();
        assert!(!ledger.is_registered(ALICE).await.unwrap());
        ledger.register_user(ALICE).await.unwrap();
        assert!(ledger.is_registered(ALICE).await.unwrap());
        assert!(matches!(
            ledger.register_user(ALICE).await,
            Err(LedgerError::AlreadyRegistered(a)) if a == ALICE
        ));
        assert!(ledger.is_registered(ALICE).await.unwrap());
    }

    #[tokio::test]
    async fn file_ids_are_sequential_per_ledger() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.record_file(ALICE, "cid-a").await.unwrap(), 1);
        assert_eq!(ledger.record_file(BOB, "cid-b").await.unwrap(), 2);
        assert_eq!(ledger.record_file(ALICE, "cid-c").await.unwrap(), 3);
        assert_eq!(ledger.files_owned_by(ALICE).await.unwrap(), vec![1, 3]);
        assert_eq!(ledger.head().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn custom_starting_id() {
        let ledger = InMemoryLedger::with_next_file_id(7);
        assert_eq!(ledger.record_file(ALICE, "cid").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn only_owner_changes_grants() {
        let ledger = InMemoryLedger::new();
        let id = ledger.record_file(ALICE, "cid").await.unwrap();

        assert!(matches!(
            ledger.grant_access(BOB, id, CAROL).await,
            Err(LedgerError::NotFileOwner(_))
        ));
        assert!(matches!(
            ledger.revoke_access(BOB, id, ALICE).await,
            Err(LedgerError::NotFileOwner(_))
        ));
        assert!(ledger.access_list(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn grant_and_revoke_are_idempotent() {
        let ledger = InMemoryLedger::new();
        let id = ledger.record_file(ALICE, "cid").await.unwrap();

        ledger.grant_access(ALICE, id, BOB).await.unwrap();
        ledger.grant_access(ALICE, id, BOB).await.unwrap();
        assert_eq!(ledger.access_list(id).await.unwrap(), vec![BOB]);
        assert!(ledger.can_access(id, BOB).await.unwrap());

        ledger.revoke_access(ALICE, id, BOB).await.unwrap();
        ledger.revoke_access(ALICE, id, BOB).await.unwrap();
        assert!(ledger.access_list(id).await.unwrap().is_empty());
        assert!(!ledger.can_access(id, BOB).await.unwrap());
    }

    #[tokio::test]
    async fn owner_always_has_access() {
        let ledger = InMemoryLedger::new();
        let id = ledger.record_file(ALICE, "cid").await.unwrap();
        assert!(ledger.can_access(id, ALICE).await.unwrap());
        assert_eq!(ledger.file_cid(id, ALICE).await.unwrap(), "cid");
    }

    #[tokio::test]
    async fn file_cid_denies_strangers() {
        let ledger = InMemoryLedger::new();
        let id = ledger.record_file(ALICE, "cid").await.unwrap();
        assert!(matches!(
            ledger.file_cid(id, CAROL).await,
            Err(LedgerError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn unknown_file_is_not_found() {
        let ledger = InMemoryLedger::new();
        assert!(matches!(ledger.file(99).await, Err(LedgerError::FileNotFound(99))));
        assert!(matches!(
            ledger.grant_access(ALICE, 99, BOB).await,
            Err(LedgerError::FileNotFound(99))
        ));
    }

    #[tokio::test]
    async fn reverting_blocks_writes_but_not_reads() {
        let ledger = InMemoryLedger::new();
        let id = ledger.record_file(ALICE, "cid").await.unwrap();
        ledger.set_reverting(true);
        assert!(matches!(
            ledger.record_file(ALICE, "cid2").await,
            Err(LedgerError::TransactionFailed(_))
        ));
        assert!(ledger.can_access(id, ALICE).await.unwrap());
        ledger.set_reverting(false);
        assert_eq!(ledger.record_file(ALICE, "cid2").await.unwrap(), 2);
    }
}
