// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fil_actors_runtime::runtime::Policy;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::sector::StoragePower;

/// Power credited for each committed sector, independent of the sector's size.
pub const SECTOR_POWER_INCREMENT: u64 = 1;

pub fn sector_power_increment() -> StoragePower {
    StoragePower::from(SECTOR_POWER_INCREMENT)
}

/// Last epoch at which a PoSt for the period opened at `start` is on time.
pub fn proving_period_end(policy: &Policy, start: ChainEpoch) -> ChainEpoch {
    start + policy.proving_period_blocks
}

pub fn public_key_fits(policy: &Policy, key: &[u8]) -> bool {
    key.len() <= policy.max_public_key_size
}
