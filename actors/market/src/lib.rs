// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_shared::METHOD_CONSTRUCTOR;
use log::debug;
use num_derive::FromPrimitive;
use num_traits::Signed;

use fil_actors_runtime::runtime::builtins::Type;
use fil_actors_runtime::runtime::{ActorCode, Runtime};
use fil_actors_runtime::{actor_dispatch, actor_error, ActorError, SYSTEM_ACTOR_ADDR};

pub use self::state::*;
pub use self::types::*;

mod state;
mod types;

/// Storage market actor methods available
#[derive(FromPrimitive)]
#[repr(u64)]
pub enum Method {
    Constructor = METHOD_CONSTRUCTOR,
    AddAsk = 2,
    UpdatePower = 3,
    GetAsk = 4,
    GetTotalPower = 5,
}

/// Storage Market Actor
pub struct Actor;

impl Actor {
    pub fn constructor(rt: &impl Runtime) -> Result<(), ActorError> {
        rt.validate_immediate_caller_is(std::iter::once(&SYSTEM_ACTOR_ADDR))?;

        let st = State::new(rt.store())?;
        rt.create(&st)?;
        Ok(())
    }

    /// Posts an offer of capacity on behalf of the calling miner.
    pub fn add_ask(rt: &impl Runtime, params: AddAskParams) -> Result<AddAskReturn, ActorError> {
        rt.validate_immediate_caller_type(std::iter::once(&Type::StorageMiner))?;

        if params.price.is_negative() {
            return Err(actor_error!(illegal_argument, "negative ask price: {}", params.price));
        }
        if !params.size.is_positive() {
            return Err(actor_error!(
                illegal_argument,
                "ask size must be positive: {}",
                params.size
            ));
        }

        let miner = rt.message().caller();
        let id = rt.transaction(|st: &mut State, rt| {
            st.put_ask(rt.store(), Ask { miner, price: params.price, size: params.size })
        })?;
        debug!("recorded ask {} from {}", id, miner);
        Ok(AddAskReturn { id })
    }

    /// Adds the calling miner's newly committed power to the network total.
    pub fn update_power(rt: &impl Runtime, params: UpdatePowerParams) -> Result<(), ActorError> {
        rt.validate_immediate_caller_type(std::iter::once(&Type::StorageMiner))?;

        if params.delta.is_negative() {
            return Err(actor_error!(illegal_argument, "negative power delta: {}", params.delta));
        }

        rt.transaction(|st: &mut State, _| {
            st.total_power += params.delta;
            Ok(())
        })
    }

    pub fn get_ask(rt: &impl Runtime, params: GetAskParams) -> Result<GetAskReturn, ActorError> {
        rt.validate_immediate_caller_accept_any()?;
        let st: State = rt.state()?;
        st.get_ask(rt.store(), params.id)?
            .ok_or_else(|| actor_error!(not_found, "no ask with id {}", params.id))
    }

    pub fn get_total_power(rt: &impl Runtime) -> Result<GetTotalPowerReturn, ActorError> {
        rt.validate_immediate_caller_accept_any()?;
        let st: State = rt.state()?;
        Ok(GetTotalPowerReturn { total_power: st.total_power })
    }
}

impl ActorCode for Actor {
    type Methods = Method;

    fn name() -> &'static str {
        "StorageMarket"
    }

    actor_dispatch! {
        Constructor => constructor,
        AddAsk => add_ask,
        UpdatePower => update_power,
        GetAsk => get_ask,
        GetTotalPower => get_total_power,
    }
}
