// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

#![allow(dead_code)]

use std::cell::RefCell;

use fil_actor_miner::ext::market::{ADD_ASK_METHOD, UPDATE_POWER_METHOD};
use fil_actor_miner::{
    Actor, AddAskParams, AddAskReturn, CommitSectorParams, GetProvingPeriodStartReturn, Method,
    MinerConstructorParams, State, SubmitPoStParams, UpdatePeerIDParams,
};
use fil_actors_runtime::test_utils::*;
use fil_actors_runtime::{ActorError, STORAGE_MARKET_ACTOR_ADDR, SYSTEM_ACTOR_ADDR};
use fvm_ipld_encoding::ipld_block::IpldBlock;
use fvm_shared::address::Address;
use fvm_shared::bigint::bigint_ser::BigIntSer;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::error::ExitCode;
use fvm_shared::sector::StoragePower;
use num_traits::{ToPrimitive, Zero};

pub const MINER_ADDR: Address = Address::new_id(1000);
pub const OWNER_ADDR: Address = Address::new_id(100);
pub const OTHER_ADDR: Address = Address::new_id(101);

pub fn expect_empty(res: Option<IpldBlock>) {
    assert!(res.is_none());
}

pub struct ActorHarness {
    pub receiver: Address,
    pub owner: Address,
    pub public_key: Vec<u8>,
    pub pledge_bytes: StoragePower,
    pub peer_id: Vec<u8>,
    pub collateral: TokenAmount,
}

impl ActorHarness {
    pub fn new(pledge_bytes: u64) -> ActorHarness {
        ActorHarness {
            receiver: MINER_ADDR,
            owner: OWNER_ADDR,
            public_key: vec![7; 48],
            pledge_bytes: StoragePower::from(pledge_bytes),
            peer_id: b"12D3KooW".to_vec(),
            collateral: TokenAmount::from_whole(10),
        }
    }

    pub fn new_runtime(&self) -> MockRuntime {
        MockRuntime {
            receiver: self.receiver,
            caller: RefCell::new(SYSTEM_ACTOR_ADDR),
            caller_type: RefCell::new(*SYSTEM_ACTOR_CODE_ID),
            ..Default::default()
        }
    }

    pub fn constructor_params(&self) -> MinerConstructorParams {
        MinerConstructorParams {
            owner: self.owner,
            public_key: self.public_key.clone(),
            pledge_bytes: self.pledge_bytes.clone(),
            peer_id: self.peer_id.clone(),
            collateral: self.collateral.clone(),
        }
    }

    pub fn construct(
        &self,
        rt: &MockRuntime,
        params: MinerConstructorParams,
    ) -> Result<Option<IpldBlock>, ActorError> {
        rt.set_caller(*SYSTEM_ACTOR_CODE_ID, SYSTEM_ACTOR_ADDR);
        rt.expect_validate_caller_addr(vec![SYSTEM_ACTOR_ADDR]);
        let ret = rt.call::<Actor>(
            Method::Constructor as u64,
            IpldBlock::serialize_cbor(&params).unwrap(),
        );
        rt.verify();
        ret
    }

    pub fn construct_and_verify(&self, rt: &MockRuntime) {
        let ret = self.construct(rt, self.constructor_params()).unwrap();
        expect_empty(ret);
    }

    pub fn get_state(&self, rt: &MockRuntime) -> State {
        rt.get_state::<State>()
    }

    pub fn commit_sector(
        &self,
        rt: &MockRuntime,
        comm_r: &[u8],
        comm_d: &[u8],
    ) -> Result<Option<IpldBlock>, ActorError> {
        self.commit_sector_with_market(rt, comm_r, comm_d, ExitCode::OK)
    }

    /// Commits a sector, expecting the power update to the market exactly when the
    /// commitment passes the duplicate check.
    pub fn commit_sector_with_market(
        &self,
        rt: &MockRuntime,
        comm_r: &[u8],
        comm_d: &[u8],
        market_exit: ExitCode,
    ) -> Result<Option<IpldBlock>, ActorError> {
        let st = self.get_state(rt);
        let duplicate = st.has_sector(&rt.store, comm_r).unwrap();

        rt.set_caller(*ACCOUNT_ACTOR_CODE_ID, self.owner);
        rt.expect_validate_caller_any();
        if !duplicate {
            rt.expect_send(
                STORAGE_MARKET_ACTOR_ADDR,
                UPDATE_POWER_METHOD,
                IpldBlock::serialize_cbor(&BigIntSer(&StoragePower::from(1))).unwrap(),
                TokenAmount::zero(),
                None,
                market_exit,
            );
        }
        let params = CommitSectorParams {
            sector_number: st.power.to_u64().unwrap(),
            comm_r: comm_r.to_vec(),
            comm_d: comm_d.to_vec(),
        };
        let ret = rt.call::<Actor>(
            Method::CommitSector as u64,
            IpldBlock::serialize_cbor(&params).unwrap(),
        );
        rt.verify();
        ret
    }

    /// Adds an ask from `caller`. The market send is only expected when the call is
    /// expected to get as far as the market.
    pub fn add_ask(
        &self,
        rt: &MockRuntime,
        caller: Address,
        price: TokenAmount,
        size: u64,
        market: Option<(Option<IpldBlock>, ExitCode)>,
    ) -> Result<Option<IpldBlock>, ActorError> {
        rt.set_caller(*ACCOUNT_ACTOR_CODE_ID, caller);
        rt.expect_validate_caller_addr(vec![self.owner]);
        let params = AddAskParams { price, size: StoragePower::from(size) };
        if let Some((ret, code)) = market {
            rt.expect_send(
                STORAGE_MARKET_ACTOR_ADDR,
                ADD_ASK_METHOD,
                IpldBlock::serialize_cbor(&params).unwrap(),
                TokenAmount::zero(),
                ret,
                code,
            );
        }
        let ret =
            rt.call::<Actor>(Method::AddAsk as u64, IpldBlock::serialize_cbor(&params).unwrap());
        rt.verify();
        ret
    }

    pub fn add_ask_and_verify(&self, rt: &MockRuntime, size: u64, ask_id: u64) -> u64 {
        let ret = self
            .add_ask(
                rt,
                self.owner,
                TokenAmount::from_atto(10),
                size,
                Some((IpldBlock::serialize_cbor(&ask_id).unwrap(), ExitCode::OK)),
            )
            .unwrap();
        let ret: AddAskReturn = ret.unwrap().deserialize().unwrap();
        ret.ask_id
    }

    pub fn submit_post(
        &self,
        rt: &MockRuntime,
        caller: Address,
        epoch: ChainEpoch,
    ) -> Result<Option<IpldBlock>, ActorError> {
        rt.set_epoch(epoch);
        rt.set_caller(*ACCOUNT_ACTOR_CODE_ID, caller);
        rt.expect_validate_caller_addr(vec![self.owner]);
        let params = SubmitPoStParams { proof: vec![0xde, 0xad] };
        let ret = rt.call::<Actor>(
            Method::SubmitPoSt as u64,
            IpldBlock::serialize_cbor(&params).unwrap(),
        );
        rt.verify();
        ret
    }

    pub fn update_peer_id(
        &self,
        rt: &MockRuntime,
        caller: Address,
        new_id: Vec<u8>,
    ) -> Result<Option<IpldBlock>, ActorError> {
        rt.set_caller(*ACCOUNT_ACTOR_CODE_ID, caller);
        rt.expect_validate_caller_addr(vec![self.owner]);
        let params = UpdatePeerIDParams { new_id };
        let ret = rt.call::<Actor>(
            Method::UpdatePeerID as u64,
            IpldBlock::serialize_cbor(&params).unwrap(),
        );
        rt.verify();
        ret
    }

    pub fn get_proving_period_start(&self, rt: &MockRuntime) -> Option<ChainEpoch> {
        rt.set_caller(*ACCOUNT_ACTOR_CODE_ID, OTHER_ADDR);
        rt.expect_validate_caller_any();
        let ret: GetProvingPeriodStartReturn = rt
            .call::<Actor>(Method::GetProvingPeriodStart as u64, None)
            .unwrap()
            .unwrap()
            .deserialize()
            .unwrap();
        rt.verify();
        ret.proving_period_start
    }
}
