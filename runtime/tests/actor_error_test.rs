use fil_actors_runtime::{deserialize_block, ActorError, SendError};
use fvm_ipld_encoding::ipld_block::IpldBlock;
use fvm_shared::error::{ErrorNumber, ExitCode};
use test_case::test_case;

#[test_case(ExitCode::USR_ILLEGAL_STATE, true; "illegal state")]
#[test_case(ExitCode::USR_SERIALIZATION, true; "serialization")]
#[test_case(ExitCode::USR_ASSERTION_FAILED, true; "assertion failed")]
#[test_case(ExitCode::USR_ILLEGAL_ARGUMENT, false; "illegal argument")]
#[test_case(ExitCode::USR_FORBIDDEN, false; "forbidden")]
#[test_case(ExitCode::new(36), false; "actor specific")]
fn fault_classification(code: ExitCode, fault: bool) {
    assert_eq!(fault, ActorError::unchecked(code, "msg".to_string()).is_fault());
}

#[test_case(ErrorNumber::NotFound, ExitCode::USR_NOT_FOUND; "not found")]
#[test_case(ErrorNumber::InsufficientFunds, ExitCode::USR_INSUFFICIENT_FUNDS; "insufficient funds")]
#[test_case(ErrorNumber::ReadOnly, ExitCode::USR_READ_ONLY; "read only")]
#[test_case(ErrorNumber::LimitExceeded, ExitCode::USR_ASSERTION_FAILED; "other")]
fn send_errors_map_to_exit_codes(number: ErrorNumber, code: ExitCode) {
    let err: ActorError = SendError(number).into();
    assert_eq!(code, err.exit_code());
}

#[test]
fn deserialize_block_decodes_expected_type() {
    let block = IpldBlock::serialize_cbor(&17u64).unwrap();
    assert_eq!(17u64, deserialize_block::<u64>(block).unwrap());
}

#[test]
fn deserialize_block_rejects_wrong_shape() {
    let block = IpldBlock::serialize_cbor(&"seventeen").unwrap();
    let err = deserialize_block::<u64>(block).unwrap_err();
    assert_eq!(ExitCode::USR_SERIALIZATION, err.exit_code());
    assert!(err.is_fault());
}

#[test]
fn deserialize_block_requires_a_value() {
    let err = deserialize_block::<u64>(None).unwrap_err();
    assert_eq!(ExitCode::USR_ASSERTION_FAILED, err.exit_code());
    assert!(err.is_fault());
}
