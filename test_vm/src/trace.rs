// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_encoding::ipld_block::IpldBlock;
use fvm_shared::address::Address;
use fvm_shared::econ::TokenAmount;
use fvm_shared::error::{ErrorNumber, ExitCode};
use fvm_shared::{ActorID, MethodNum};

type ReturnValue = Option<IpldBlock>;

/// A trace of an actor method invocation.
#[derive(Clone, Debug)]
pub struct InvocationTrace {
    pub from: ActorID,
    pub to: Address,
    pub value: TokenAmount,
    pub method: MethodNum,
    pub params: Option<IpldBlock>,
    /// error_number is set when the message could not be delivered
    pub error_number: Option<ErrorNumber>,
    // no need to check return_value or exit_code if error_number is set
    pub exit_code: ExitCode,
    pub return_value: ReturnValue,
    /// Set when the invocation aborted with an internal fault rather than a revert.
    pub fault: bool,
    pub subinvocations: Vec<InvocationTrace>,
}

/// An expectation for a method invocation trace.
/// Non-optional fields must always be specified, and are always checked against any trace.
/// Optional fields are ignored when checking the expectation against a trace.
#[derive(Clone, Debug)]
pub struct ExpectInvocation {
    pub from: ActorID,
    pub to: Address,
    pub method: MethodNum,
    pub value: Option<TokenAmount>,
    pub params: Option<Option<IpldBlock>>,
    /// If error_number is set, exit_code and return_value are not checked
    pub error_number: Option<ErrorNumber>,
    pub exit_code: ExitCode,
    pub return_value: Option<ReturnValue>,
    pub fault: Option<bool>,
    pub subinvocs: Option<Vec<ExpectInvocation>>,
}

impl ExpectInvocation {
    /// Asserts that a trace matches this expectation, including subinvocations.
    pub fn matches(&self, invoc: &InvocationTrace) {
        let id = format!("[{}→{}:{}]", invoc.from, invoc.to, invoc.method);
        self.quick_match(invoc, String::new());

        if let Some(error_number) = &self.error_number {
            assert_eq!(
                Some(*error_number),
                invoc.error_number,
                "{} unexpected error_number: expected: {}, was: {:?}",
                id,
                error_number,
                invoc.error_number
            );
        } else {
            assert_eq!(
                self.exit_code, invoc.exit_code,
                "{} unexpected exit_code: expected: {}, was: {}",
                id, self.exit_code, invoc.exit_code
            );

            if let Some(v) = &self.return_value {
                assert_eq!(
                    v, &invoc.return_value,
                    "{} unexpected return_value: expected: {:?}, was: {:?}",
                    id, v, invoc.return_value
                );
            }
        }

        if let Some(v) = &self.value {
            assert_eq!(
                v, &invoc.value,
                "{} unexpected value: expected: {}, was: {} ",
                id, v, invoc.value
            );
        }
        if let Some(p) = &self.params {
            assert_eq!(
                p, &invoc.params,
                "{} unexpected params: expected: {:x?}, was: {:x?}",
                id, p, invoc.params
            );
        }
        if let Some(f) = self.fault {
            assert_eq!(f, invoc.fault, "{} unexpected fault flag", id);
        }

        if let Some(expect_subinvocs) = &self.subinvocs {
            let subinvocs = &invoc.subinvocations;

            let panic_str = format!(
                "unexpected subinvocs:\n expected: \n[\n{}]\n was:\n[\n{}]\n",
                self.fmt_expect_invocs(expect_subinvocs),
                self.fmt_invocs(subinvocs)
            );
            assert_eq!(subinvocs.len(), expect_subinvocs.len(), "{} {}", id, panic_str);

            for (invoc, expect_invoc) in subinvocs.iter().zip(expect_subinvocs) {
                expect_invoc.quick_match(invoc, panic_str.clone());
                expect_invoc.matches(invoc);
            }
        }
    }

    pub fn fmt_invocs(&self, invocs: &[InvocationTrace]) -> String {
        invocs.iter().enumerate().fold(String::new(), |mut s, (i, invoc)| {
            use std::fmt::Write;
            let _ = writeln!(s, "{}: [{}:{}],", i, invoc.to, invoc.method);
            s
        })
    }

    pub fn fmt_expect_invocs(&self, exs: &[ExpectInvocation]) -> String {
        exs.iter().enumerate().fold(String::new(), |mut s, (i, ex)| {
            use std::fmt::Write;
            let _ = writeln!(s, "{}: [{}:{}],", i, ex.to, ex.method);
            s
        })
    }

    pub fn quick_match(&self, invoc: &InvocationTrace, extra_msg: String) {
        let id = format!("[{}→{}:{}]", invoc.from, invoc.to, invoc.method);
        assert_eq!(
            self.from, invoc.from,
            "{} unexpected from addr: expected: {}, was: {} \n{}",
            id, self.from, invoc.from, extra_msg
        );
        assert_eq!(
            self.to, invoc.to,
            "{} unexpected to addr: expected: {}, was: {} \n{}",
            id, self.to, invoc.to, extra_msg
        );
        assert_eq!(
            self.method, invoc.method,
            "{} unexpected method: expected: {}, was: {} \n{}",
            id, self.method, invoc.method, extra_msg
        );
    }
}

impl Default for ExpectInvocation {
    // Defaults are mainly useful for ignoring optional fields with a ..Default::default() clause.
    // The addresses must generally be provided explicitly.
    // Defaults include successful exit code.
    fn default() -> Self {
        Self {
            from: 0,
            to: Address::new_id(0),
            method: 0,
            value: None,
            params: None,
            error_number: None,
            exit_code: ExitCode::OK,
            return_value: None,
            fault: None,
            subinvocs: None,
        }
    }
}
