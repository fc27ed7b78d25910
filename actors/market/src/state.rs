// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use fvm_shared::bigint::bigint_ser;
use fvm_shared::sector::StoragePower;
use num_traits::Zero;

use fil_actors_runtime::{ActorError, Config, Map2, DEFAULT_HAMT_CONFIG};

use crate::types::{Ask, AskID};

pub type AskMap<BS> = Map2<BS, AskID, Ask>;
pub const ASKS_CONFIG: Config = DEFAULT_HAMT_CONFIG;

/// Market actor state
#[derive(Clone, Serialize_tuple, Deserialize_tuple, Debug, PartialEq, Eq)]
pub struct State {
    /// HAMT[AskID]Ask
    pub asks: Cid,
    /// The id the next ask will be recorded under.
    pub next_ask_id: AskID,
    /// Sum of power reported by all miners.
    #[serde(with = "bigint_ser")]
    pub total_power: StoragePower,
}

impl State {
    pub fn new<BS: Blockstore>(store: &BS) -> Result<Self, ActorError> {
        let asks = AskMap::flush_empty(store, ASKS_CONFIG)?;
        Ok(Self { asks, next_ask_id: 0, total_power: StoragePower::zero() })
    }

    /// Records an ask under a fresh id and returns that id.
    pub fn put_ask<BS: Blockstore>(&mut self, store: &BS, ask: Ask) -> Result<AskID, ActorError> {
        let mut asks = AskMap::load(store, &self.asks, ASKS_CONFIG, "asks")?;
        let id = self.next_ask_id;
        asks.set(&id, ask)?;
        self.asks = asks.flush()?;
        self.next_ask_id += 1;
        Ok(id)
    }

    pub fn get_ask<BS: Blockstore>(
        &self,
        store: &BS,
        id: AskID,
    ) -> Result<Option<Ask>, ActorError> {
        let asks = AskMap::load(store, &self.asks, ASKS_CONFIG, "asks")?;
        Ok(asks.get(&id)?.cloned())
    }
}
