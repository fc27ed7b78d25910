// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_encoding::ipld_block::IpldBlock;
use fvm_ipld_hamt::Sha256;
use fvm_shared::error::{ErrorNumber, ExitCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use self::actor_error::*;
pub use self::builtin::*;
pub use self::dispatch::*;
pub use self::util::*;

pub mod actor_error;
pub mod builtin;
pub mod runtime;
pub mod util;

mod dispatch;

#[cfg(feature = "test_utils")]
pub mod test_utils;

#[macro_use]
extern crate lazy_static;

/// The hasher used to key HAMT entries.
pub type Hasher = Sha256;

/// A transport-level failure to deliver a message, as opposed to the receiver
/// aborting with an exit code.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("send failed: {0}")]
pub struct SendError(pub ErrorNumber);

impl From<SendError> for ActorError {
    fn from(err: SendError) -> Self {
        let code = match err.0 {
            ErrorNumber::NotFound => ExitCode::USR_NOT_FOUND,
            ErrorNumber::InsufficientFunds => ExitCode::USR_INSUFFICIENT_FUNDS,
            ErrorNumber::IllegalArgument => ExitCode::USR_ILLEGAL_ARGUMENT,
            ErrorNumber::Forbidden => ExitCode::USR_FORBIDDEN,
            ErrorNumber::ReadOnly => ExitCode::USR_READ_ONLY,
            _ => ExitCode::USR_ASSERTION_FAILED,
        };
        ActorError::unchecked(code, err.to_string())
    }
}

/// Decodes the return block of a successful send into the expected type.
/// A missing block or one of the wrong shape is a fault in the callee's contract.
pub fn deserialize_block<T>(ret: Option<IpldBlock>) -> Result<T, ActorError>
where
    T: DeserializeOwned,
{
    ret.context_code(ExitCode::USR_ASSERTION_FAILED, "return expected")?
        .deserialize()
        .exit_code(ExitCode::USR_SERIALIZATION)
}
