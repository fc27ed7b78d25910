// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_encoding::strict_bytes;
use fvm_ipld_encoding::tuple::*;
use fvm_shared::address::Address;
use fvm_shared::bigint::bigint_ser;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::sector::{SectorNumber, StoragePower};
use serde::{Deserialize, Serialize};

/// Parameters for constructing a miner. The system actor sends these when a miner is registered.
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct MinerConstructorParams {
    pub owner: Address,
    #[serde(with = "strict_bytes")]
    pub public_key: Vec<u8>,
    #[serde(with = "bigint_ser")]
    pub pledge_bytes: StoragePower,
    #[serde(with = "strict_bytes")]
    pub peer_id: Vec<u8>,
    pub collateral: TokenAmount,
}

#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct AddAskParams {
    pub price: TokenAmount,
    #[serde(with = "bigint_ser")]
    pub size: StoragePower,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct AddAskReturn {
    pub ask_id: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct GetOwnerReturn {
    pub owner: Address,
}

#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct CommitSectorParams {
    pub sector_number: SectorNumber,
    #[serde(with = "strict_bytes")]
    pub comm_r: Vec<u8>,
    #[serde(with = "strict_bytes")]
    pub comm_d: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct GetKeyReturn {
    #[serde(with = "strict_bytes")]
    pub public_key: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct GetPeerIDReturn {
    #[serde(with = "strict_bytes")]
    pub peer_id: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct UpdatePeerIDParams {
    #[serde(with = "strict_bytes")]
    pub new_id: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct GetStorageReturn {
    #[serde(with = "bigint_ser")]
    pub power: StoragePower,
}

/// Proof content is carried opaquely. Verification is not this actor's concern.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct SubmitPoStParams {
    #[serde(with = "strict_bytes")]
    pub proof: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct GetProvingPeriodStartReturn {
    pub proving_period_start: Option<ChainEpoch>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct GetSectorParams {
    #[serde(with = "strict_bytes")]
    pub comm_r: Vec<u8>,
}
