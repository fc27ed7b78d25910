// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fil_actor_market::{
    Ask, GetAskParams, GetTotalPowerReturn, Method as MarketMethod, UpdatePowerParams,
};
use fil_actor_miner::{
    AddAskParams, AddAskReturn, CommitSectorParams, GetProvingPeriodStartReturn, GetStorageReturn,
    Method as MinerMethod, MinerConstructorParams, MinerError, SubmitPoStParams, UpdatePeerIDParams,
};
use fil_actors_runtime::runtime::Policy;
use fil_actors_runtime::STORAGE_MARKET_ACTOR_ADDR;
use fvm_ipld_encoding::ipld_block::IpldBlock;
use fvm_shared::address::Address;
use fvm_shared::econ::TokenAmount;
use fvm_shared::error::{ErrorNumber, ExitCode};
use fvm_shared::sector::StoragePower;
use fvm_shared::METHOD_SEND;
use num_traits::Zero;
use test_case::test_case;

use test_vm::trace::ExpectInvocation;
use test_vm::util::{
    apply_code, apply_ok, create_accounts, create_miner, market_state, miner_call, miner_state,
    serialize_ok,
};
use test_vm::TestVM;

const PLEDGE: u64 = 1000;

fn miner_params(owner: Address) -> MinerConstructorParams {
    MinerConstructorParams {
        owner,
        public_key: vec![7; 48],
        pledge_bytes: StoragePower::from(PLEDGE),
        peer_id: b"peer-a".to_vec(),
        collateral: TokenAmount::zero(),
    }
}

fn setup(v: &TestVM) -> (Address, Address, Address) {
    let accounts = create_accounts(v, 2, &TokenAmount::from_whole(10));
    let (owner, other) = (accounts[0], accounts[1]);
    let miner = create_miner(v, &miner_params(owner));
    v.take_invocations();
    (owner, other, miner)
}

fn commit(comm_r: &[u8], comm_d: &[u8]) -> CommitSectorParams {
    CommitSectorParams { sector_number: 0, comm_r: comm_r.to_vec(), comm_d: comm_d.to_vec() }
}

fn total_power(v: &TestVM, from: &Address) -> StoragePower {
    let ret = apply_ok(
        v,
        from,
        &STORAGE_MARKET_ACTOR_ADDR,
        &TokenAmount::zero(),
        MarketMethod::GetTotalPower as u64,
        None::<()>,
    );
    ret.unwrap().deserialize::<GetTotalPowerReturn>().unwrap().total_power
}

#[test]
fn proving_cycle_scenario() {
    test_vm::init_logging().ok();
    let v = TestVM::new_with_policy(Policy { proving_period_blocks: 2000, ..Default::default() })
        .unwrap();
    let (owner, other, miner) = setup(&v);
    let owner_id = owner.id().unwrap();
    let miner_id = miner.id().unwrap();

    v.set_epoch(100);
    apply_ok(
        &v,
        &owner,
        &miner,
        &TokenAmount::zero(),
        MinerMethod::CommitSector as u64,
        Some(commit(b"r1", b"d1")),
    );
    ExpectInvocation {
        from: owner_id,
        to: miner,
        method: MinerMethod::CommitSector as u64,
        subinvocs: Some(vec![ExpectInvocation {
            from: miner_id,
            to: STORAGE_MARKET_ACTOR_ADDR,
            method: MarketMethod::UpdatePower as u64,
            params: Some(
                IpldBlock::serialize_cbor(&UpdatePowerParams { delta: StoragePower::from(1) })
                    .unwrap(),
            ),
            ..Default::default()
        }]),
        ..Default::default()
    }
    .matches(v.take_invocations().last().unwrap());

    let st = miner_state(&v, &miner);
    assert_eq!(StoragePower::from(1), st.power);
    assert_eq!(Some(100), st.proving_period_start);
    assert_eq!(StoragePower::from(1), total_power(&v, &owner));

    v.set_epoch(150);
    apply_ok(
        &v,
        &owner,
        &miner,
        &TokenAmount::zero(),
        MinerMethod::SubmitPoSt as u64,
        Some(SubmitPoStParams { proof: b"proof".to_vec() }),
    );
    let st = miner_state(&v, &miner);
    assert_eq!(Some(2100), st.proving_period_start);
    assert_eq!(Some(150), st.last_post);

    v.set_epoch(5000);
    apply_code(
        &v,
        &owner,
        &miner,
        &TokenAmount::zero(),
        MinerMethod::SubmitPoSt as u64,
        Some(SubmitPoStParams { proof: b"proof".to_vec() }),
        ExitCode::USR_ILLEGAL_ARGUMENT,
    );
    let st = miner_state(&v, &miner);
    assert_eq!(Some(2100), st.proving_period_start);
    assert_eq!(Some(150), st.last_post);

    apply_code(
        &v,
        &other,
        &miner,
        &TokenAmount::zero(),
        MinerMethod::UpdatePeerID as u64,
        Some(UpdatePeerIDParams { new_id: b"peer-x".to_vec() }),
        MinerError::CallerUnauthorized.exit_code(),
    );
    assert_eq!(b"peer-a".to_vec(), miner_state(&v, &miner).peer_id);

    let start: GetProvingPeriodStartReturn =
        miner_call(&v, &other, &miner, MinerMethod::GetProvingPeriodStart, None::<()>);
    assert_eq!(Some(2100), start.proving_period_start);
    let storage: GetStorageReturn =
        miner_call(&v, &other, &miner, MinerMethod::GetStorage, None::<()>);
    assert_eq!(StoragePower::from(1), storage.power);
}

#[test]
fn asks_are_recorded_by_the_market() {
    let v = TestVM::new().unwrap();
    let (owner, other, miner) = setup(&v);

    for (expected_id, size) in [(0u64, 100u64), (1, 250)] {
        let ret: AddAskReturn = miner_call(
            &v,
            &owner,
            &miner,
            MinerMethod::AddAsk,
            Some(AddAskParams { price: TokenAmount::from_atto(5), size: StoragePower::from(size) }),
        );
        assert_eq!(expected_id, ret.ask_id);
    }
    assert_eq!(StoragePower::from(350), miner_state(&v, &miner).locked_storage);

    let ret = apply_ok(
        &v,
        &other,
        &STORAGE_MARKET_ACTOR_ADDR,
        &TokenAmount::zero(),
        MarketMethod::GetAsk as u64,
        Some(GetAskParams { id: 1 }),
    );
    let ask: Ask = ret.unwrap().deserialize().unwrap();
    assert_eq!(Ask { miner, price: TokenAmount::from_atto(5), size: StoragePower::from(250) }, ask);
}

#[test]
fn market_rejection_rolls_back_the_ask() {
    let v = TestVM::new().unwrap();
    let (owner, _, miner) = setup(&v);
    let market_before = v.actor(&STORAGE_MARKET_ACTOR_ADDR).unwrap();

    apply_code(
        &v,
        &owner,
        &miner,
        &TokenAmount::zero(),
        MinerMethod::AddAsk as u64,
        Some(AddAskParams { price: TokenAmount::from_atto(-1), size: StoragePower::from(10) }),
        MinerError::StoragemarketCallFailed.exit_code(),
    );
    ExpectInvocation {
        from: owner.id().unwrap(),
        to: miner,
        method: MinerMethod::AddAsk as u64,
        exit_code: MinerError::StoragemarketCallFailed.exit_code(),
        fault: Some(false),
        subinvocs: Some(vec![ExpectInvocation {
            from: miner.id().unwrap(),
            to: STORAGE_MARKET_ACTOR_ADDR,
            method: MarketMethod::AddAsk as u64,
            exit_code: ExitCode::USR_ILLEGAL_ARGUMENT,
            subinvocs: Some(vec![]),
            ..Default::default()
        }]),
        ..Default::default()
    }
    .matches(v.take_invocations().last().unwrap());

    assert!(miner_state(&v, &miner).locked_storage.is_zero());
    assert_eq!(market_before.state, v.actor(&STORAGE_MARKET_ACTOR_ADDR).unwrap().state);
    assert_eq!(0, market_state(&v).next_ask_id);
}

#[test]
fn ask_beyond_pledge_never_reaches_the_market() {
    let v = TestVM::new().unwrap();
    let (owner, _, miner) = setup(&v);

    apply_code(
        &v,
        &owner,
        &miner,
        &TokenAmount::zero(),
        MinerMethod::AddAsk as u64,
        Some(AddAskParams { price: TokenAmount::zero(), size: StoragePower::from(PLEDGE + 1) }),
        MinerError::InsufficientPledge.exit_code(),
    );
    ExpectInvocation {
        from: owner.id().unwrap(),
        to: miner,
        method: MinerMethod::AddAsk as u64,
        exit_code: MinerError::InsufficientPledge.exit_code(),
        subinvocs: Some(vec![]),
        ..Default::default()
    }
    .matches(v.take_invocations().last().unwrap());
}

#[test]
fn oversized_key_leaves_no_miner_behind() {
    let v = TestVM::new().unwrap();
    let owner = create_accounts(&v, 1, &TokenAmount::zero())[0];
    let mut params = miner_params(owner);
    params.public_key = vec![1; v.policy().max_public_key_size + 1];

    let (addr, res) = v.create_miner(&params).unwrap();
    assert_eq!(MinerError::PublicKeyTooBig.exit_code(), res.code);
    assert!(!res.fault);
    assert!(v.actor(&addr).is_none());
}

#[test]
fn duplicate_commitment_leaves_market_power_unchanged() {
    let v = TestVM::new().unwrap();
    let (owner, _, miner) = setup(&v);

    apply_ok(
        &v,
        &owner,
        &miner,
        &TokenAmount::zero(),
        MinerMethod::CommitSector as u64,
        Some(commit(b"r1", b"d1")),
    );
    apply_code(
        &v,
        &owner,
        &miner,
        &TokenAmount::zero(),
        MinerMethod::CommitSector as u64,
        Some(commit(b"r1", b"d2")),
        MinerError::SectorCommitted.exit_code(),
    );
    assert_eq!(StoragePower::from(1), miner_state(&v, &miner).power);
    assert_eq!(StoragePower::from(1), total_power(&v, &owner));
}

#[test]
fn missing_market_surfaces_as_send_error() {
    let v = TestVM::new_empty(Policy::default()).unwrap();
    let (owner, _, miner) = setup(&v);

    apply_code(
        &v,
        &owner,
        &miner,
        &TokenAmount::zero(),
        MinerMethod::CommitSector as u64,
        Some(commit(b"r1", b"d1")),
        ExitCode::USR_NOT_FOUND,
    );
    ExpectInvocation {
        from: owner.id().unwrap(),
        to: miner,
        method: MinerMethod::CommitSector as u64,
        exit_code: ExitCode::USR_NOT_FOUND,
        subinvocs: Some(vec![ExpectInvocation {
            from: miner.id().unwrap(),
            to: STORAGE_MARKET_ACTOR_ADDR,
            method: MarketMethod::UpdatePower as u64,
            error_number: Some(ErrorNumber::NotFound),
            ..Default::default()
        }]),
        ..Default::default()
    }
    .matches(v.take_invocations().last().unwrap());

    let st = miner_state(&v, &miner);
    assert!(st.power.is_zero());
    assert_eq!(None, st.proving_period_start);
}

#[test]
fn malformed_params_are_reported_as_a_fault() {
    let v = TestVM::new().unwrap();
    let (owner, _, miner) = setup(&v);
    let before = v.actor(&miner).unwrap().state;

    let res = v
        .execute_message(
            &owner,
            &miner,
            &TokenAmount::zero(),
            MinerMethod::CommitSector as u64,
            Some(serialize_ok(&42u64)),
        )
        .unwrap();
    assert_eq!(ExitCode::USR_SERIALIZATION, res.code);
    assert!(res.fault);
    assert_eq!(before, v.actor(&miner).unwrap().state);

    ExpectInvocation {
        from: owner.id().unwrap(),
        to: miner,
        method: MinerMethod::CommitSector as u64,
        exit_code: ExitCode::USR_SERIALIZATION,
        fault: Some(true),
        ..Default::default()
    }
    .matches(v.take_invocations().last().unwrap());
}

#[test]
fn value_transfer_between_accounts() {
    let v = TestVM::new().unwrap();
    let accounts = create_accounts(&v, 2, &TokenAmount::from_atto(100));

    apply_ok(&v, &accounts[0], &accounts[1], &TokenAmount::from_atto(40), METHOD_SEND, None::<()>);
    assert_eq!(TokenAmount::from_atto(60), v.balance(&accounts[0]));
    assert_eq!(TokenAmount::from_atto(140), v.balance(&accounts[1]));
}

#[test_case(101, 101, ExitCode::SYS_INSUFFICIENT_FUNDS; "insufficient funds")]
#[test_case(0, 999, ExitCode::SYS_INVALID_RECEIVER; "unknown receiver")]
fn undeliverable_messages(value: u64, to: u64, code: ExitCode) {
    let (value, to) = (TokenAmount::from_atto(value), Address::new_id(to));
    let v = TestVM::new().unwrap();
    let accounts = create_accounts(&v, 2, &TokenAmount::from_atto(100));
    assert_eq!(Address::new_id(101), accounts[1]);

    apply_code(&v, &accounts[0], &to, &value, METHOD_SEND, None::<()>, code);
    assert_eq!(TokenAmount::from_atto(100), v.balance(&accounts[0]));
    assert!(v.take_invocations().last().unwrap().error_number.is_some());
}

#[test]
fn accounts_only_accept_value() {
    let v = TestVM::new().unwrap();
    let accounts = create_accounts(&v, 2, &TokenAmount::from_atto(100));

    apply_code(
        &v,
        &accounts[0],
        &accounts[1],
        &TokenAmount::from_atto(10),
        MinerMethod::GetOwner as u64,
        None::<()>,
        ExitCode::USR_UNHANDLED_MESSAGE,
    );
    assert_eq!(TokenAmount::from_atto(100), v.balance(&accounts[0]));
}
