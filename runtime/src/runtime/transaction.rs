// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::CborStore;
use fvm_shared::error::ExitCode;
use multihash::Code;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Runtime;
use crate::{actor_error, ActorError, AsActorError};

/// Reads and decodes the state object at `root`.
/// A missing block or one that does not decode as `S` is a fault.
pub fn load_state<BS, S>(store: &BS, root: &Cid) -> Result<S, ActorError>
where
    BS: Blockstore,
    S: DeserializeOwned,
{
    store
        .get_cbor(root)
        .with_context_code(ExitCode::USR_SERIALIZATION, || {
            format!("state at {} does not decode into the expected type", root)
        })?
        .with_context_code(ExitCode::USR_ILLEGAL_STATE, || format!("state {} not found", root))
}

/// An in-flight mutation of the receiver's state.
///
/// `begin` snapshots the committed root and decodes a private copy of the state.
/// Mutations are applied to that copy only. `commit` writes the copy and moves the
/// receiver's root forward; `abort`, or dropping the transaction, leaves the committed
/// state exactly as it was.
///
/// Nested sends may run while a transaction is open. If one of them re-enters this actor
/// and commits a change of its own, the committed root no longer matches the snapshot and
/// the outer commit fails rather than silently overwriting that change.
#[must_use = "a transaction has no effect until it is committed"]
pub struct StateTransaction<S> {
    prior_root: Cid,
    state: S,
}

impl<S> StateTransaction<S>
where
    S: Serialize + DeserializeOwned,
{
    pub fn begin<RT>(rt: &RT) -> Result<Self, ActorError>
    where
        RT: Runtime + ?Sized,
    {
        let prior_root = rt.get_state_root()?;
        let state = load_state(rt.store(), &prior_root)?;
        Ok(Self { prior_root, state })
    }

    /// The root this transaction was opened against.
    pub fn prior_root(&self) -> &Cid {
        &self.prior_root
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Runs `f` against the in-memory copy of the state.
    pub fn apply<RT, R, F>(&mut self, rt: &RT, f: F) -> Result<R, ActorError>
    where
        RT: Runtime + ?Sized,
        F: FnOnce(&mut S, &RT) -> Result<R, ActorError>,
    {
        f(&mut self.state, rt)
    }

    /// Persists the mutated copy and makes it the receiver's committed state.
    pub fn commit<RT>(self, rt: &RT) -> Result<Cid, ActorError>
    where
        RT: Runtime + ?Sized,
    {
        let current = rt.get_state_root()?;
        if current != self.prior_root {
            return Err(actor_error!(
                illegal_state;
                "state root moved from {} to {} during transaction",
                self.prior_root,
                current
            ));
        }
        let root = rt
            .store()
            .put_cbor(&self.state, Code::Blake2b256)
            .context_code(ExitCode::USR_ILLEGAL_STATE, "failed to write actor state")?;
        rt.set_state_root(&root)?;
        Ok(root)
    }

    /// Discards the in-memory copy.
    pub fn abort(self) {
        log::trace!("discarding state transaction opened at {}", self.prior_root);
    }
}
