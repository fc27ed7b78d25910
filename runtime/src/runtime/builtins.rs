// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use num_derive::FromPrimitive;

/// Identifies the builtin actor types.
#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, FromPrimitive, Debug)]
#[repr(i32)]
pub enum Type {
    System = 1,
    Account = 2,
    StorageMarket = 3,
    StorageMiner = 4,
}

impl Type {
    pub fn name(&self) -> &'static str {
        match *self {
            Type::System => "system",
            Type::Account => "account",
            Type::StorageMarket => "storagemarket",
            Type::StorageMiner => "storageminer",
        }
    }
}
