// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cid::Cid;
use fil_actors_runtime::runtime::{Policy, EMPTY_ARR_CID};
use fil_actors_runtime::test_utils::{
    MARKET_ACTOR_CODE_ID, MINER_ACTOR_CODE_ID, SYSTEM_ACTOR_CODE_ID,
};
use fil_actors_runtime::{
    ActorError, DEFAULT_HAMT_CONFIG, FIRST_NON_SINGLETON_ADDR, STORAGE_MARKET_ACTOR_ADDR,
    SYSTEM_ACTOR_ADDR,
};
use fvm_ipld_blockstore::MemoryBlockstore;
use fvm_ipld_encoding::ipld_block::IpldBlock;
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_encoding::CborStore;
use fvm_ipld_hamt::{BytesKey, Hamt, Sha256};
use fvm_shared::address::{Address, Protocol};
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::error::{ErrorNumber, ExitCode};
use fvm_shared::{ActorID, MethodNum, METHOD_CONSTRUCTOR};
use log::debug;
use num_traits::Zero;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::messaging::{InternalMessage, InvocationCtx};
use crate::trace::InvocationTrace;

pub mod messaging;
pub mod trace;
pub mod util;

/// The on-chain record of an actor: its code, state root, nonce and balance.
#[derive(Serialize_tuple, Deserialize_tuple, Clone, PartialEq, Eq, Debug)]
pub struct ActorState {
    pub code: Cid,
    pub state: Cid,
    pub call_seq: u64,
    pub balance: TokenAmount,
}

pub fn actor(code: Cid, state: Cid, call_seq: u64, balance: TokenAmount) -> ActorState {
    ActorState { code, state, call_seq, balance }
}

#[derive(Error, Debug)]
pub enum VMError {
    #[error("actor {0} not found")]
    ActorNotFound(Address),
    #[error("{0} is not an ID address")]
    NotIdAddress(Address),
    #[error("actor table: {0}")]
    Hamt(#[from] fvm_ipld_hamt::Error),
    #[error("blockstore: {0}")]
    Store(#[from] anyhow::Error),
}

/// Failures of the VM itself surface to the invoked actor as a fault.
impl From<VMError> for ActorError {
    fn from(e: VMError) -> Self {
        ActorError::unchecked(ExitCode::USR_ASSERTION_FAILED, format!("vm failure: {}", e))
    }
}

/// The receipt of a top-level message.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageResult {
    pub code: ExitCode,
    /// The abort message, empty on success.
    pub message: String,
    pub ret: Option<IpldBlock>,
    /// Set when the message aborted with an internal fault rather than a business revert.
    pub fault: bool,
}

type ActorMap = Hamt<Rc<MemoryBlockstore>, ActorState, BytesKey, Sha256>;

/// An in-memory VM executing messages against the builtin actors of this workspace.
///
/// Every invocation runs against a checkpoint of the actor table. An invocation that
/// aborts is rolled back to its checkpoint, discarding its own writes and those of
/// every call it made.
pub struct TestVM {
    pub store: Rc<MemoryBlockstore>,
    state_root: RefCell<Cid>,
    actors: RefCell<ActorMap>,
    epoch: Cell<ChainEpoch>,
    next_id: Cell<ActorID>,
    invocations: RefCell<Vec<InvocationTrace>>,
    policy: Policy,
}

impl TestVM {
    /// A VM holding the system actor and a constructed storage market.
    pub fn new() -> Result<TestVM, VMError> {
        Self::new_with_policy(Policy::default())
    }

    pub fn new_with_policy(policy: Policy) -> Result<TestVM, VMError> {
        let v = Self::new_empty(policy)?;
        v.set_actor(
            &STORAGE_MARKET_ACTOR_ADDR,
            actor(*MARKET_ACTOR_CODE_ID, *EMPTY_ARR_CID, 0, TokenAmount::zero()),
        )?;
        let res = v.execute_message(
            &SYSTEM_ACTOR_ADDR,
            &STORAGE_MARKET_ACTOR_ADDR,
            &TokenAmount::zero(),
            METHOD_CONSTRUCTOR,
            None,
        )?;
        assert_eq!(ExitCode::OK, res.code, "market construction failed: {}", res.message);
        v.take_invocations();
        Ok(v)
    }

    /// A VM holding only the system actor. Sends to any other singleton fail to deliver.
    pub fn new_empty(policy: Policy) -> Result<TestVM, VMError> {
        let store = Rc::new(MemoryBlockstore::new());
        let mut actors = ActorMap::new_with_config(store.clone(), DEFAULT_HAMT_CONFIG);
        let state_root = actors.flush()?;
        // The empty state sentinel must be present for actors to read before construction.
        store.put_cbor(&Vec::<()>::new(), multihash::Code::Blake2b256)?;

        let v = TestVM {
            store,
            state_root: RefCell::new(state_root),
            actors: RefCell::new(actors),
            epoch: Cell::new(0),
            next_id: Cell::new(FIRST_NON_SINGLETON_ADDR),
            invocations: RefCell::new(vec![]),
            policy,
        };
        v.set_actor(
            &SYSTEM_ACTOR_ADDR,
            actor(*SYSTEM_ACTOR_CODE_ID, *EMPTY_ARR_CID, 0, TokenAmount::zero()),
        )?;
        v.checkpoint()?;
        Ok(v)
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn epoch(&self) -> ChainEpoch {
        self.epoch.get()
    }

    pub fn set_epoch(&self, epoch: ChainEpoch) {
        self.epoch.set(epoch);
    }

    pub fn actor(&self, addr: &Address) -> Option<ActorState> {
        self.actors.borrow().get(&addr.to_bytes()).ok().flatten().cloned()
    }

    // blindly overwrite the actor at this address whether it previously existed or not
    pub fn set_actor(&self, addr: &Address, a: ActorState) -> Result<(), VMError> {
        if addr.protocol() != Protocol::ID {
            return Err(VMError::NotIdAddress(*addr));
        }
        self.actors.borrow_mut().set(addr.to_bytes().into(), a)?;
        Ok(())
    }

    /// Reserves the next unused ID address.
    pub fn next_address(&self) -> Address {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Address::new_id(id)
    }

    pub fn balance(&self, addr: &Address) -> TokenAmount {
        self.actor(addr).map(|a| a.balance).unwrap_or_default()
    }

    /// Flushes the actor table and returns its root.
    pub fn checkpoint(&self) -> Result<Cid, VMError> {
        let root = self.actors.borrow_mut().flush()?;
        self.state_root.replace(root);
        Ok(root)
    }

    /// Restores the actor table to a previous checkpoint.
    pub fn rollback(&self, root: Cid) -> Result<(), VMError> {
        debug!("rolling back actor table to {}", root);
        let actors = ActorMap::load_with_config(&root, self.store.clone(), DEFAULT_HAMT_CONFIG)?;
        self.actors.replace(actors);
        self.state_root.replace(root);
        Ok(())
    }

    pub fn state_root(&self) -> Cid {
        *self.state_root.borrow()
    }

    /// Decodes the state of the actor at `addr`.
    pub fn get_state<T: DeserializeOwned>(&self, addr: &Address) -> Option<T> {
        let a = self.actor(addr)?;
        self.store.get_cbor(&a.state).ok().flatten()
    }

    /// Takes the traces of all top-level messages executed since the last call.
    pub fn take_invocations(&self) -> Vec<InvocationTrace> {
        self.invocations.take()
    }

    /// Creates an actor of the given code at the next free ID address and runs its
    /// constructor, sent from the system actor. If construction aborts no actor is left behind.
    pub fn create_actor(
        &self,
        code: Cid,
        balance: TokenAmount,
        params: Option<IpldBlock>,
    ) -> Result<(Address, MessageResult), VMError> {
        let prior_root = self.checkpoint()?;
        let addr = self.next_address();

        self.set_actor(&addr, actor(code, *EMPTY_ARR_CID, 0, balance))?;
        let res = self.execute_message(
            &SYSTEM_ACTOR_ADDR,
            &addr,
            &TokenAmount::zero(),
            METHOD_CONSTRUCTOR,
            params,
        )?;
        if !res.code.is_success() {
            self.rollback(prior_root)?;
        }
        Ok((addr, res))
    }

    /// Registers a storage miner with the given constructor parameters.
    pub fn create_miner(
        &self,
        params: &fil_actor_miner::MinerConstructorParams,
    ) -> Result<(Address, MessageResult), VMError> {
        let params = IpldBlock::serialize_cbor(params)
            .map_err(|e| VMError::Store(anyhow::anyhow!("encoding constructor params: {}", e)))?;
        self.create_actor(*MINER_ACTOR_CODE_ID, TokenAmount::zero(), params)
    }

    /// Executes a top-level message. Delivery failures and actor aborts are reported in the
    /// returned receipt; an `Err` means the VM itself could not run the message.
    pub fn execute_message(
        &self,
        from: &Address,
        to: &Address,
        value: &TokenAmount,
        method: MethodNum,
        params: Option<IpldBlock>,
    ) -> Result<MessageResult, VMError> {
        let from_id = from.id().map_err(|_| VMError::NotIdAddress(*from))?;
        let mut a = self.actor(from).ok_or(VMError::ActorNotFound(*from))?;
        a.call_seq += 1;
        self.set_actor(from, a)?;
        self.checkpoint()?;

        let msg = InternalMessage { from: from_id, to: *to, value: value.clone(), method, params };
        let mut new_ctx = InvocationCtx::new(self, msg);

        let res = match new_ctx.deliverable() {
            Ok(()) => {
                let res = new_ctx.invoke();
                let invoc = new_ctx.gather_trace(res.clone());
                self.invocations.borrow_mut().push(invoc);
                res
            }
            Err(e) => {
                self.invocations.borrow_mut().push(new_ctx.undelivered_trace(e));
                Err(ActorError::unchecked(
                    undelivered_exit_code(e),
                    format!("message not delivered: {:?}", e),
                ))
            }
        };
        self.checkpoint()?;

        Ok(match res {
            Ok(ret) => {
                MessageResult { code: ExitCode::OK, message: String::new(), ret, fault: false }
            }
            Err(e) => MessageResult {
                code: e.exit_code(),
                message: e.msg().to_string(),
                ret: None,
                fault: e.is_fault(),
            },
        })
    }
}

fn undelivered_exit_code(e: ErrorNumber) -> ExitCode {
    match e {
        ErrorNumber::InsufficientFunds => ExitCode::SYS_INSUFFICIENT_FUNDS,
        _ => ExitCode::SYS_INVALID_RECEIVER,
    }
}

/// Installs a logger for tests, honouring RUST_LOG.
pub fn init_logging() -> Result<(), log::SetLoggerError> {
    pretty_env_logger::try_init()
}
