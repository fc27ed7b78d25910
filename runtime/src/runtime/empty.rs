// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_encoding::DAG_CBOR;
use multihash::{Code, MultihashDigest};

lazy_static! {
    /// The CID of the CBOR encoding of an empty array, the root of an actor whose
    /// state has not been created yet.
    pub static ref EMPTY_ARR_CID: Cid = Cid::new_v1(DAG_CBOR, Code::Blake2b256.digest(&[0x80]));
}
