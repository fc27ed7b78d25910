// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fil_actor_miner::{Actor, GetKeyReturn, GetOwnerReturn, GetStorageReturn, Method};
use fil_actors_runtime::test_utils::*;
use fvm_ipld_encoding::ipld_block::IpldBlock;
use fvm_shared::error::ExitCode;
use fvm_shared::sector::StoragePower;
use serde::de::DeserializeOwned;

mod util;

use util::*;

fn call_getter<T: DeserializeOwned>(rt: &MockRuntime, method: Method) -> T {
    rt.set_caller(*ACCOUNT_ACTOR_CODE_ID, OTHER_ADDR);
    rt.expect_validate_caller_any();
    let ret = rt.call::<Actor>(method as u64, None).unwrap().unwrap().deserialize().unwrap();
    rt.verify();
    ret
}

#[test]
fn getters_need_no_authorization() {
    let h = ActorHarness::new(1000);
    let rt = h.new_runtime();
    h.construct_and_verify(&rt);
    let root = *rt.state.borrow();

    let owner: GetOwnerReturn = call_getter(&rt, Method::GetOwner);
    assert_eq!(h.owner, owner.owner);

    let key: GetKeyReturn = call_getter(&rt, Method::GetKey);
    assert_eq!(h.public_key, key.public_key);

    let storage: GetStorageReturn = call_getter(&rt, Method::GetStorage);
    assert_eq!(StoragePower::from(0), storage.power);

    assert_eq!(None, h.get_proving_period_start(&rt));

    // Reads through a transaction write back an identical state.
    assert_eq!(root, *rt.state.borrow());
}

#[test]
fn storage_reports_committed_power() {
    let h = ActorHarness::new(1000);
    let rt = h.new_runtime();
    h.construct_and_verify(&rt);
    h.commit_sector(&rt, b"r1", b"d1").unwrap();
    h.commit_sector(&rt, b"r2", b"d2").unwrap();

    let storage: GetStorageReturn = call_getter(&rt, Method::GetStorage);
    assert_eq!(StoragePower::from(2), storage.power);
}

#[test]
fn getters_reject_arguments() {
    let h = ActorHarness::new(1000);
    let rt = h.new_runtime();
    h.construct_and_verify(&rt);
    let res = rt.call::<Actor>(Method::GetOwner as u64, IpldBlock::serialize_cbor(&1u8).unwrap());
    expect_abort(ExitCode::USR_ILLEGAL_ARGUMENT, res);
}

#[test]
fn corrupt_state_is_a_fault() {
    let h = ActorHarness::new(1000);
    let rt = h.new_runtime();
    h.construct_and_verify(&rt);
    rt.replace_state(&("not", "a", "miner"));

    rt.expect_validate_caller_any();
    let err = rt.call::<Actor>(Method::GetPeerID as u64, None).unwrap_err();
    assert_eq!(ExitCode::USR_SERIALIZATION, err.exit_code());
    assert!(err.is_fault());
    rt.verify();
}
