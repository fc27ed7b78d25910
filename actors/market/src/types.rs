// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_encoding::tuple::*;
use fvm_shared::address::Address;
use fvm_shared::bigint::bigint_ser;
use fvm_shared::econ::TokenAmount;
use fvm_shared::sector::StoragePower;
use serde::{Deserialize, Serialize};

/// Identifies an ask in the market's ask book.
pub type AskID = u64;

#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct AddAskParams {
    pub price: TokenAmount,
    #[serde(with = "bigint_ser")]
    pub size: StoragePower,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct AddAskReturn {
    pub id: AskID,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct UpdatePowerParams {
    #[serde(with = "bigint_ser")]
    pub delta: StoragePower,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct GetAskParams {
    pub id: AskID,
}

/// An open offer of capacity posted by a storage miner.
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct Ask {
    pub miner: Address,
    pub price: TokenAmount,
    #[serde(with = "bigint_ser")]
    pub size: StoragePower,
}

pub type GetAskReturn = Ask;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct GetTotalPowerReturn {
    #[serde(with = "bigint_ser")]
    pub total_power: StoragePower,
}
