// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_shared::clock::ChainEpoch;

// A trait for runtime policy configuration
pub trait RuntimePolicy {
    fn policy(&self) -> &Policy;
}

// The policy itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Maximum number of bytes in a miner's block-signing public key.
    pub max_public_key_size: usize,
    /// Length of the window, in epochs, within which a miner must submit a PoSt.
    pub proving_period_blocks: ChainEpoch,
}

impl Default for Policy {
    fn default() -> Policy {
        Policy {
            max_public_key_size: policy_constants::MAX_PUBLIC_KEY_SIZE,
            proving_period_blocks: policy_constants::PROVING_PERIOD_BLOCKS,
        }
    }
}

pub mod policy_constants {
    use fvm_shared::clock::ChainEpoch;

    pub const MAX_PUBLIC_KEY_SIZE: usize = 100;

    #[cfg(not(feature = "short-proving-period"))]
    pub const PROVING_PERIOD_BLOCKS: ChainEpoch = 2000;
    #[cfg(feature = "short-proving-period")]
    pub const PROVING_PERIOD_BLOCKS: ChainEpoch = 200;
}
