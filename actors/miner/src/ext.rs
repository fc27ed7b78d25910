// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod market {
    use fvm_ipld_encoding::tuple::*;
    use fvm_shared::bigint::bigint_ser;
    use fvm_shared::econ::TokenAmount;
    use fvm_shared::sector::StoragePower;
    use serde::{Deserialize, Serialize};

    pub const ADD_ASK_METHOD: u64 = 2;
    pub const UPDATE_POWER_METHOD: u64 = 3;

    #[derive(Serialize_tuple, Deserialize_tuple)]
    pub struct AddAskParams {
        pub price: TokenAmount,
        #[serde(with = "bigint_ser")]
        pub size: StoragePower,
    }

    #[derive(Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AddAskReturn {
        pub id: u64,
    }

    #[derive(Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct UpdatePowerParams {
        #[serde(with = "bigint_ser")]
        pub delta: StoragePower,
    }
}
