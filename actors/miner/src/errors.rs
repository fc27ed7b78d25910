// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

use fil_actors_runtime::ActorError;
use fvm_shared::error::ExitCode;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Reverts the miner actor may return. Each value is the exit code reported for it.
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MinerError {
    PublicKeyTooBig = 33,
    InvalidSector = 34,
    SectorCommitted = 35,
    StoragemarketCallFailed = 36,
    CallerUnauthorized = 37,
    InsufficientPledge = 38,
}

const FIRST_MINER_ERROR: u32 = MinerError::PublicKeyTooBig as u32;

static MESSAGES: [&str; 6] = [
    "public key exceeds the maximum size",
    "sectorID out of range",
    "sector already committed",
    "call to StorageMarket failed",
    "not authorized to call the method",
    "not enough pledged",
];

impl MinerError {
    pub fn exit_code(self) -> ExitCode {
        ExitCode::new(self as u32)
    }

    pub fn message(self) -> &'static str {
        MESSAGES[(self as u32 - FIRST_MINER_ERROR) as usize]
    }

    /// Looks up the revert reported under `code`, if it is one of ours.
    pub fn from_exit_code(code: ExitCode) -> Option<Self> {
        Self::from_u32(code.value())
    }
}

impl fmt::Display for MinerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for MinerError {}

impl From<MinerError> for ActorError {
    fn from(e: MinerError) -> Self {
        ActorError::unchecked(e.exit_code(), e.message().to_string())
    }
}
