// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fil_actor_market::State as MarketState;
use fil_actor_miner::{Method as MinerMethod, MinerConstructorParams, State as MinerState};
use fil_actors_runtime::runtime::EMPTY_ARR_CID;
use fil_actors_runtime::test_utils::ACCOUNT_ACTOR_CODE_ID;
use fil_actors_runtime::STORAGE_MARKET_ACTOR_ADDR;
use fvm_ipld_encoding::ipld_block::IpldBlock;
use fvm_shared::address::Address;
use fvm_shared::econ::TokenAmount;
use fvm_shared::error::ExitCode;
use fvm_shared::MethodNum;
use num_traits::Zero;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{actor, TestVM};

/// Installs `count` account actors holding `balance` each and returns their ID addresses.
pub fn create_accounts(v: &TestVM, count: u64, balance: &TokenAmount) -> Vec<Address> {
    (0..count)
        .map(|_| {
            let addr = v.next_address();
            v.set_actor(&addr, actor(*ACCOUNT_ACTOR_CODE_ID, *EMPTY_ARR_CID, 0, balance.clone()))
                .unwrap();
            addr
        })
        .collect()
}

pub fn apply_ok<S: Serialize>(
    v: &TestVM,
    from: &Address,
    to: &Address,
    value: &TokenAmount,
    method: MethodNum,
    params: Option<S>,
) -> Option<IpldBlock> {
    apply_code(v, from, to, value, method, params, ExitCode::OK)
}

pub fn apply_code<S: Serialize>(
    v: &TestVM,
    from: &Address,
    to: &Address,
    value: &TokenAmount,
    method: MethodNum,
    params: Option<S>,
    code: ExitCode,
) -> Option<IpldBlock> {
    let params = params.map(|p| serialize_ok(&p));
    let res = v.execute_message(from, to, value, method, params).unwrap();
    assert_eq!(code, res.code, "expected code {}, got {} ({})", code, res.code, res.message);
    res.ret
}

/// Sends a message to a miner and decodes its return.
pub fn miner_call<S: Serialize, R: DeserializeOwned>(
    v: &TestVM,
    from: &Address,
    miner: &Address,
    method: MinerMethod,
    params: Option<S>,
) -> R {
    let ret = apply_ok(v, from, miner, &TokenAmount::zero(), method as u64, params);
    ret.expect("return expected").deserialize().unwrap()
}

pub fn serialize_ok<S: Serialize>(s: &S) -> IpldBlock {
    IpldBlock::serialize_cbor(s).unwrap().unwrap()
}

/// Registers a miner and asserts that construction succeeded.
pub fn create_miner(v: &TestVM, params: &MinerConstructorParams) -> Address {
    let (addr, res) = v.create_miner(params).unwrap();
    assert_eq!(ExitCode::OK, res.code, "miner construction failed: {}", res.message);
    addr
}

pub fn miner_state(v: &TestVM, miner: &Address) -> MinerState {
    v.get_state(miner).unwrap()
}

pub fn market_state(v: &TestVM) -> MarketState {
    v.get_state(&STORAGE_MARKET_ACTOR_ADDR).unwrap()
}
