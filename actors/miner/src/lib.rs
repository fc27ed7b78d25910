// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::iter;

use fvm_ipld_encoding::ipld_block::IpldBlock;
use fvm_shared::address::Protocol;
use fvm_shared::econ::TokenAmount;
use fvm_shared::METHOD_CONSTRUCTOR;
use log::{info, warn};
use num_derive::FromPrimitive;
use num_traits::{Signed, Zero};

use fil_actors_runtime::runtime::{ActorCode, Runtime};
use fil_actors_runtime::{
    actor_dispatch, actor_error, deserialize_block, ActorError, STORAGE_MARKET_ACTOR_ADDR,
    SYSTEM_ACTOR_ADDR,
};

pub use self::errors::*;
pub use self::policy::*;
pub use self::state::*;
pub use self::types::*;

mod errors;
#[doc(hidden)]
pub mod ext;
mod policy;
mod state;
mod types;

/// Storage Miner actor methods available
#[derive(FromPrimitive, Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum Method {
    Constructor = METHOD_CONSTRUCTOR,
    AddAsk = 2,
    GetOwner = 3,
    CommitSector = 4,
    GetKey = 5,
    GetPeerID = 6,
    UpdatePeerID = 7,
    GetStorage = 8,
    SubmitPoSt = 9,
    GetProvingPeriodStart = 10,
    GetSector = 11,
}

const METHOD_NAMES: [(Method, &str); 11] = [
    (Method::Constructor, "constructor"),
    (Method::AddAsk, "addAsk"),
    (Method::GetOwner, "getOwner"),
    (Method::CommitSector, "commitSector"),
    (Method::GetKey, "getKey"),
    (Method::GetPeerID, "getPeerID"),
    (Method::UpdatePeerID, "updatePeerID"),
    (Method::GetStorage, "getStorage"),
    (Method::SubmitPoSt, "submitPoSt"),
    (Method::GetProvingPeriodStart, "getProvingPeriodStart"),
    (Method::GetSector, "getSector"),
];

impl Method {
    /// The name this method is exported under.
    pub fn name(self) -> &'static str {
        METHOD_NAMES[self as usize - 1].1
    }

    pub fn from_name(name: &str) -> Option<Self> {
        METHOD_NAMES.iter().find(|(_, n)| *n == name).map(|(m, _)| *m)
    }
}

/// Checks that the immediate caller is the miner's owner, reporting a mismatch
/// as CallerUnauthorized.
fn validate_owner(rt: &impl Runtime, st: &State) -> Result<(), ActorError> {
    rt.validate_immediate_caller_is(iter::once(&st.owner))
        .map_err(|_| MinerError::CallerUnauthorized.into())
}

/// Miner Actor
pub struct Actor;

impl Actor {
    pub fn constructor(
        rt: &impl Runtime,
        params: MinerConstructorParams,
    ) -> Result<(), ActorError> {
        rt.validate_immediate_caller_is(iter::once(&SYSTEM_ACTOR_ADDR))?;

        if !public_key_fits(rt.policy(), &params.public_key) {
            return Err(ActorError::from(MinerError::PublicKeyTooBig).wrap(format!(
                "key of {} bytes, limit {}",
                params.public_key.len(),
                rt.policy().max_public_key_size
            )));
        }
        if params.owner.protocol() != Protocol::ID {
            return Err(actor_error!(
                illegal_argument,
                "owner must be an ID address: {}",
                params.owner
            ));
        }
        if params.pledge_bytes.is_negative() {
            return Err(actor_error!(illegal_argument, "negative pledge: {}", params.pledge_bytes));
        }

        let st = State::new(rt.store(), params)?;
        rt.create(&st)?;
        Ok(())
    }

    /// Promises `size` of the miner's pledged capacity to the storage market at `price`,
    /// returning the id the market assigned to the ask.
    pub fn add_ask(rt: &impl Runtime, params: AddAskParams) -> Result<AddAskReturn, ActorError> {
        rt.transaction(|st: &mut State, rt| {
            validate_owner(rt, st)?;

            if !params.size.is_positive() {
                return Err(actor_error!(
                    illegal_argument,
                    "ask size must be positive: {}",
                    params.size
                ));
            }

            if params.size > st.available_pledge() {
                return Err(MinerError::InsufficientPledge.into());
            }
            st.locked_storage += &params.size;

            let ret = rt.send(
                &STORAGE_MARKET_ACTOR_ADDR,
                ext::market::ADD_ASK_METHOD,
                IpldBlock::serialize_cbor(&ext::market::AddAskParams {
                    price: params.price,
                    size: params.size,
                })?,
                TokenAmount::zero(),
            )?;
            if !ret.exit_code.is_success() {
                return Err(ActorError::from(MinerError::StoragemarketCallFailed)
                    .wrap(format!("addAsk exited with {}", ret.exit_code)));
            }

            let ask: ext::market::AddAskReturn = deserialize_block(ret.return_data)?;
            Ok(AddAskReturn { ask_id: ask.id })
        })
    }

    pub fn get_owner(rt: &impl Runtime) -> Result<GetOwnerReturn, ActorError> {
        rt.validate_immediate_caller_accept_any()?;
        rt.transaction(|st: &mut State, _| Ok(GetOwnerReturn { owner: st.owner }))
    }

    /// Records a sector commitment and reports the added power to the storage market.
    /// The first commitment opens the miner's first proving period.
    pub fn commit_sector(rt: &impl Runtime, params: CommitSectorParams) -> Result<(), ActorError> {
        rt.validate_immediate_caller_accept_any()?;

        rt.transaction(|st: &mut State, rt| {
            if st.has_sector(rt.store(), &params.comm_r)? {
                return Err(MinerError::SectorCommitted.into());
            }

            if st.power.is_zero() {
                let epoch = rt.curr_epoch();
                info!("miner {} starting proving period at {}", rt.message().receiver(), epoch);
                st.proving_period_start = Some(epoch);
            }

            let inc = sector_power_increment();
            st.power += &inc;
            st.put_sector(
                rt.store(),
                params.comm_r,
                SectorOnChainInfo { sector_number: params.sector_number, comm_d: params.comm_d },
            )?;

            let ret = rt.send(
                &STORAGE_MARKET_ACTOR_ADDR,
                ext::market::UPDATE_POWER_METHOD,
                IpldBlock::serialize_cbor(&ext::market::UpdatePowerParams { delta: inc })?,
                TokenAmount::zero(),
            )?;
            if !ret.exit_code.is_success() {
                return Err(ActorError::from(MinerError::StoragemarketCallFailed)
                    .wrap(format!("updatePower exited with {}", ret.exit_code)));
            }
            Ok(())
        })
    }

    pub fn get_key(rt: &impl Runtime) -> Result<GetKeyReturn, ActorError> {
        rt.validate_immediate_caller_accept_any()?;
        rt.transaction(|st: &mut State, _| Ok(GetKeyReturn { public_key: st.public_key.clone() }))
    }

    pub fn get_peer_id(rt: &impl Runtime) -> Result<GetPeerIDReturn, ActorError> {
        rt.validate_immediate_caller_accept_any()?;
        let st: State = rt.state()?;
        Ok(GetPeerIDReturn { peer_id: st.peer_id })
    }

    pub fn update_peer_id(rt: &impl Runtime, params: UpdatePeerIDParams) -> Result<(), ActorError> {
        rt.transaction(|st: &mut State, rt| {
            validate_owner(rt, st)?;
            st.peer_id = params.new_id;
            Ok(())
        })
    }

    pub fn get_storage(rt: &impl Runtime) -> Result<GetStorageReturn, ActorError> {
        rt.validate_immediate_caller_accept_any()?;
        rt.transaction(|st: &mut State, _| Ok(GetStorageReturn { power: st.power.clone() }))
    }

    /// Accepts a proof for the current proving period if it arrives on time, and opens
    /// the next period where the current one ends.
    pub fn submit_post(rt: &impl Runtime, params: SubmitPoStParams) -> Result<(), ActorError> {
        rt.transaction(|st: &mut State, rt| {
            validate_owner(rt, st)?;

            let start = st.proving_period_start.ok_or_else(|| {
                actor_error!(illegal_argument, "no proving period open, commit a sector first")
            })?;
            let end = proving_period_end(rt.policy(), start);
            let epoch = rt.curr_epoch();

            if epoch > end {
                warn!(
                    "miner {} submitted PoSt at {} after its period ended at {}",
                    rt.message().receiver(),
                    epoch,
                    end
                );
                return Err(actor_error!(
                    illegal_argument,
                    "submitted PoSt late, need to pay a fee"
                ));
            }

            info!(
                "miner {} accepted PoSt of {} bytes at {}, next period starts {}",
                rt.message().receiver(),
                params.proof.len(),
                epoch,
                end
            );
            st.proving_period_start = Some(end);
            st.last_post = Some(epoch);
            Ok(())
        })
    }

    pub fn get_proving_period_start(
        rt: &impl Runtime,
    ) -> Result<GetProvingPeriodStartReturn, ActorError> {
        rt.validate_immediate_caller_accept_any()?;
        let st: State = rt.state()?;
        Ok(GetProvingPeriodStartReturn { proving_period_start: st.proving_period_start })
    }

    pub fn get_sector(
        rt: &impl Runtime,
        params: GetSectorParams,
    ) -> Result<SectorOnChainInfo, ActorError> {
        rt.validate_immediate_caller_accept_any()?;
        let st: State = rt.state()?;
        st.get_sector(rt.store(), &params.comm_r)?.ok_or_else(|| MinerError::InvalidSector.into())
    }
}

impl ActorCode for Actor {
    type Methods = Method;

    fn name() -> &'static str {
        "StorageMiner"
    }

    actor_dispatch! {
        Constructor => constructor,
        AddAsk => add_ask,
        GetOwner => get_owner,
        CommitSector => commit_sector,
        GetKey => get_key,
        GetPeerID => get_peer_id,
        UpdatePeerID => update_peer_id,
        GetStorage => get_storage,
        SubmitPoSt => submit_post,
        GetProvingPeriodStart => get_proving_period_start,
        GetSector => get_sector,
    }
}
