// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key material at rest.
//!
//! A [`SealedMaterial`] is what the metadata store holds. The key and IV can
//! only be read back by presenting an [`AccessProof`], which is minted by the
//! access orchestrator after a fresh ledger authorization check.

use serde::{Deserialize, Serialize};

use super::EncryptionMaterial;
use crate::service::access::AccessProof;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedMaterial(EncryptionMaterial);

impl SealedMaterial {
    pub fn seal(material: EncryptionMaterial) -> Self {
        Self(material)
    }

    /// Reveal the key material to a requester the ledger has just authorized.
    pub fn reveal(&self, _proof: &AccessProof) -> &EncryptionMaterial {
        &self.0
    }
}

impl std::fmt::Debug for SealedMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealedMaterial(..)")
    }
}

impl From<EncryptionMaterial> for SealedMaterial {
    fn from(material: EncryptionMaterial) -> Self {
        Self::seal(material)
    }
}
