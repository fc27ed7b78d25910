// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::cell::RefCell;
use std::rc::Rc;

use cid::Cid;
use fil_actor_market::Actor as MarketActor;
use fil_actor_miner::Actor as MinerActor;
use fil_actors_runtime::runtime::builtins::Type;
use fil_actors_runtime::runtime::{ActorCode, MessageInfo, Policy, Runtime, RuntimePolicy};
use fil_actors_runtime::test_utils::ACTOR_TYPES;
use fil_actors_runtime::{actor_error, ActorError, SendError};
use fvm_ipld_blockstore::MemoryBlockstore;
use fvm_ipld_encoding::ipld_block::IpldBlock;
use fvm_shared::address::Address;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::error::{ErrorNumber, ExitCode};
use fvm_shared::{ActorID, MethodNum, Response, METHOD_SEND};
use log::{debug, error, trace};

use crate::trace::InvocationTrace;
use crate::TestVM;

#[derive(Clone, Debug)]
pub struct InternalMessage {
    pub from: ActorID,
    pub to: Address,
    pub value: TokenAmount,
    pub method: MethodNum,
    pub params: Option<IpldBlock>,
}

/// The runtime seen by one actor invocation. Nested sends create a fresh context one
/// level deeper in the call stack.
pub struct InvocationCtx<'invocation> {
    pub v: &'invocation TestVM,
    pub msg: InternalMessage,
    pub caller_validated: RefCell<bool>,
    pub policy: &'invocation Policy,
    pub subinvocations: RefCell<Vec<InvocationTrace>>,
    pub depth: usize,
}

impl MessageInfo for InvocationCtx<'_> {
    fn caller(&self) -> Address {
        Address::new_id(self.msg.from)
    }
    fn receiver(&self) -> Address {
        self.msg.to
    }
    fn method_number(&self) -> MethodNum {
        self.msg.method
    }
    fn value_received(&self) -> TokenAmount {
        self.msg.value.clone()
    }
}

impl<'invocation> InvocationCtx<'invocation> {
    pub fn new(v: &'invocation TestVM, msg: InternalMessage) -> Self {
        InvocationCtx {
            v,
            msg,
            caller_validated: RefCell::new(false),
            policy: v.policy(),
            subinvocations: RefCell::new(vec![]),
            depth: 0,
        }
    }

    /// Checks that the message can reach its receiver: the receiver exists and the
    /// sender can cover the value.
    pub fn deliverable(&self) -> Result<(), ErrorNumber> {
        if self.v.actor(&self.msg.to).is_none() {
            return Err(ErrorNumber::NotFound);
        }
        if self.msg.value.is_negative() {
            return Err(ErrorNumber::IllegalArgument);
        }
        let from = self.v.actor(&Address::new_id(self.msg.from)).ok_or(ErrorNumber::NotFound)?;
        if from.balance < self.msg.value {
            return Err(ErrorNumber::InsufficientFunds);
        }
        Ok(())
    }

    pub fn gather_trace(
        &mut self,
        invoke_result: Result<Option<IpldBlock>, ActorError>,
    ) -> InvocationTrace {
        let (ret, code, fault) = match invoke_result {
            Ok(rb) => (rb, ExitCode::OK, false),
            Err(ae) => (None, ae.exit_code(), ae.is_fault()),
        };
        let msg = self.msg.clone();
        InvocationTrace {
            from: msg.from,
            to: msg.to,
            value: msg.value,
            method: msg.method,
            params: msg.params,
            error_number: None,
            exit_code: code,
            return_value: ret,
            fault,
            subinvocations: self.subinvocations.take(),
        }
    }

    pub fn undelivered_trace(&self, error_number: ErrorNumber) -> InvocationTrace {
        let msg = self.msg.clone();
        InvocationTrace {
            from: msg.from,
            to: msg.to,
            value: msg.value,
            method: msg.method,
            params: msg.params,
            error_number: Some(error_number),
            exit_code: ExitCode::OK,
            return_value: None,
            fault: false,
            subinvocations: vec![],
        }
    }

    fn receiver_state(&self) -> Result<crate::ActorState, ActorError> {
        self.v
            .actor(&self.msg.to)
            .ok_or_else(|| actor_error!(illegal_state; "receiver {} does not exist", self.msg.to))
    }

    /// Transfers the message value and runs the receiver's method. If the method aborts,
    /// every write made since the transfer, including those of nested calls, is undone.
    pub fn invoke(&mut self) -> Result<Option<IpldBlock>, ActorError> {
        let prior_root = self.v.checkpoint()?;
        trace!(
            "{:indent$}invoke {} -> {} method {} value {}",
            "",
            self.msg.from,
            self.msg.to,
            self.msg.method,
            self.msg.value,
            indent = self.depth * 2
        );

        let res = self.transfer_and_call();
        let res = match res {
            Ok(_) if self.msg.method != METHOD_SEND && !*self.caller_validated.borrow() => {
                Err(actor_error!(assertion_failed; "failed to validate caller"))
            }
            res => res,
        };

        if let Err(e) = &res {
            if e.is_fault() {
                error!(
                    "fault in {} method {}: exit code {}: {}",
                    self.msg.to,
                    self.msg.method,
                    e.exit_code(),
                    e.msg()
                );
            } else {
                debug!(
                    "{} method {} aborted with {}: {}",
                    self.msg.to,
                    self.msg.method,
                    e.exit_code(),
                    e.msg()
                );
            }
            self.v.rollback(prior_root)?;
        }
        res
    }

    fn transfer_and_call(&self) -> Result<Option<IpldBlock>, ActorError> {
        // Load, deduct, store from actor before loading to actor to handle self-send case
        let from_addr = Address::new_id(self.msg.from);
        if !self.msg.value.is_zero() {
            let mut from_actor = self.v.actor(&from_addr).ok_or_else(|| {
                actor_error!(illegal_state; "sender {} does not exist", from_addr)
            })?;
            from_actor.balance -= &self.msg.value;
            self.v.set_actor(&from_addr, from_actor)?;

            let mut to_actor = self.receiver_state()?;
            to_actor.balance += &self.msg.value;
            self.v.set_actor(&self.msg.to, to_actor)?;
        }

        // Exit early on send
        if self.msg.method == METHOD_SEND {
            return Ok(None);
        }

        let code = self.receiver_state()?.code;
        let params = self.msg.params.clone();
        match ACTOR_TYPES.get(&code) {
            Some(Type::StorageMiner) => MinerActor::invoke_method(self, self.msg.method, params),
            Some(Type::StorageMarket) => MarketActor::invoke_method(self, self.msg.method, params),
            Some(Type::System) | Some(Type::Account) => Err(actor_error!(
                unhandled_message;
                "{} actors only accept value transfers",
                code
            )),
            None => Err(actor_error!(illegal_state; "no actor implementation for code {}", code)),
        }
    }

    fn validate_once(&self) -> Result<(), ActorError> {
        if self.caller_validated.replace(true) {
            return Err(actor_error!(assertion_failed; "caller double validated"));
        }
        Ok(())
    }
}

impl<'invocation> Runtime for InvocationCtx<'invocation> {
    type Blockstore = Rc<MemoryBlockstore>;

    fn message(&self) -> &dyn MessageInfo {
        self
    }

    fn curr_epoch(&self) -> ChainEpoch {
        self.v.epoch()
    }

    fn validate_immediate_caller_accept_any(&self) -> Result<(), ActorError> {
        self.validate_once()
    }

    fn validate_immediate_caller_is<'a, I>(&self, addresses: I) -> Result<(), ActorError>
    where
        I: IntoIterator<Item = &'a Address>,
    {
        self.validate_once()?;
        let caller = self.message().caller();
        if addresses.into_iter().any(|a| *a == caller) {
            return Ok(());
        }
        Err(actor_error!(forbidden; "immediate caller {} forbidden", caller))
    }

    fn validate_immediate_caller_type<'a, I>(&self, types: I) -> Result<(), ActorError>
    where
        I: IntoIterator<Item = &'a Type>,
    {
        self.validate_once()?;
        let caller = self.message().caller();
        let to_match = self.v.actor(&caller).and_then(|a| ACTOR_TYPES.get(&a.code).copied());
        if let Some(t) = to_match {
            if types.into_iter().any(|want| *want == t) {
                return Ok(());
            }
        }
        Err(actor_error!(forbidden; "immediate caller {} of type {:?} forbidden", caller, to_match))
    }

    fn current_balance(&self) -> TokenAmount {
        self.v.balance(&self.msg.to)
    }

    fn get_state_root(&self) -> Result<Cid, ActorError> {
        Ok(self.receiver_state()?.state)
    }

    fn set_state_root(&self, root: &Cid) -> Result<(), ActorError> {
        let mut act = self.receiver_state()?;
        act.state = *root;
        self.v.set_actor(&self.msg.to, act)?;
        Ok(())
    }

    fn store(&self) -> &Rc<MemoryBlockstore> {
        &self.v.store
    }

    fn send(
        &self,
        to: &Address,
        method: MethodNum,
        params: Option<IpldBlock>,
        value: TokenAmount,
    ) -> Result<Response, SendError> {
        let from_id = self.msg.to.id().map_err(|_| SendError(ErrorNumber::IllegalOperation))?;
        let new_actor_msg = InternalMessage { from: from_id, to: *to, value, method, params };
        let mut new_ctx = InvocationCtx {
            v: self.v,
            msg: new_actor_msg,
            caller_validated: RefCell::new(false),
            policy: self.policy,
            subinvocations: RefCell::new(vec![]),
            depth: self.depth + 1,
        };

        if let Err(e) = new_ctx.deliverable() {
            self.subinvocations.borrow_mut().push(new_ctx.undelivered_trace(e));
            return Err(SendError(e));
        }

        let res = new_ctx.invoke();
        let invoc = new_ctx.gather_trace(res.clone());
        self.subinvocations.borrow_mut().push(invoc);

        Ok(match res {
            Ok(ret) => Response { exit_code: ExitCode::OK, return_data: ret },
            Err(e) => Response { exit_code: e.exit_code(), return_data: None },
        })
    }
}

impl RuntimePolicy for InvocationCtx<'_> {
    fn policy(&self) -> &Policy {
        self.policy
    }
}
