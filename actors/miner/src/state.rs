// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::strict_bytes;
use fvm_ipld_encoding::tuple::*;
use fvm_shared::address::Address;
use fvm_shared::bigint::bigint_ser;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::sector::{SectorNumber, StoragePower};
use num_traits::Zero;

use fil_actors_runtime::{ActorError, Config, Map2, DEFAULT_HAMT_CONFIG};

use crate::{MinerConstructorParams, MinerError};

pub type SectorMap<BS> = Map2<BS, Vec<u8>, SectorOnChainInfo>;
pub const SECTORS_CONFIG: Config = DEFAULT_HAMT_CONFIG;

/// Miner actor state. Collateral is recorded here but never moved by this actor.
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct State {
    /// Address authorized to make privileged changes.
    pub owner: Address,

    /// Libp2p identity the miner operates under. Not checked against the owner.
    #[serde(with = "strict_bytes")]
    pub peer_id: Vec<u8>,

    /// Key used to verify blocks produced by this miner.
    #[serde(with = "strict_bytes")]
    pub public_key: Vec<u8>,

    /// Upper bound on capacity the miner may offer to the market.
    #[serde(with = "bigint_ser")]
    pub pledge_bytes: StoragePower,

    pub collateral: TokenAmount,

    /// Sectors committed by this miner, keyed by commR.
    pub sectors: Cid, // HAMT[commR]SectorOnChainInfo

    /// Start of the current proving period. None until the first sector is committed.
    pub proving_period_start: Option<ChainEpoch>,

    /// Epoch of the most recently accepted PoSt.
    pub last_post: Option<ChainEpoch>,

    /// Capacity promised to the market through asks.
    #[serde(with = "bigint_ser")]
    pub locked_storage: StoragePower,

    #[serde(with = "bigint_ser")]
    pub power: StoragePower,
}

#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct SectorOnChainInfo {
    pub sector_number: SectorNumber,
    /// CommD
    #[serde(with = "strict_bytes")]
    pub comm_d: Vec<u8>,
}

impl State {
    pub fn new<BS: Blockstore>(
        store: &BS,
        params: MinerConstructorParams,
    ) -> Result<Self, ActorError> {
        let sectors = SectorMap::flush_empty(store, SECTORS_CONFIG)?;
        Ok(Self {
            owner: params.owner,
            peer_id: params.peer_id,
            public_key: params.public_key,
            pledge_bytes: params.pledge_bytes,
            collateral: params.collateral,
            sectors,
            proving_period_start: None,
            last_post: None,
            locked_storage: StoragePower::zero(),
            power: StoragePower::zero(),
        })
    }

    /// Pledged capacity not yet promised to the market.
    pub fn available_pledge(&self) -> StoragePower {
        &self.pledge_bytes - &self.locked_storage
    }

    /// Records a newly committed sector. A commR that is already present is rejected
    /// and the sector map is left untouched.
    pub fn put_sector<BS: Blockstore>(
        &mut self,
        store: &BS,
        comm_r: Vec<u8>,
        info: SectorOnChainInfo,
    ) -> Result<(), ActorError> {
        let mut sectors = SectorMap::load(store, &self.sectors, SECTORS_CONFIG, "sectors")?;
        if !sectors.set_if_absent(&comm_r, info)? {
            return Err(MinerError::SectorCommitted.into());
        }
        self.sectors = sectors.flush()?;
        Ok(())
    }

    pub fn get_sector<BS: Blockstore>(
        &self,
        store: &BS,
        comm_r: &[u8],
    ) -> Result<Option<SectorOnChainInfo>, ActorError> {
        let sectors = SectorMap::load(store, &self.sectors, SECTORS_CONFIG, "sectors")?;
        Ok(sectors.get(&comm_r.to_vec())?.cloned())
    }

    pub fn has_sector<BS: Blockstore>(
        &self,
        store: &BS,
        comm_r: &[u8],
    ) -> Result<bool, ActorError> {
        let sectors = SectorMap::load(store, &self.sectors, SECTORS_CONFIG, "sectors")?;
        sectors.contains_key(&comm_r.to_vec())
    }
}
