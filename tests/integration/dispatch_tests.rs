//! Dispatcher behaviour against the mock rig: ordering, the minimum-length
//! contract, first-failure-aborts, and each simple handler's side effect.

use sonoprobe::app::ports::{MuxTarget, PowerDomain};
use sonoprobe::config::{ProbeConfig, VerifyPolicy};
use sonoprobe::error::{DispatchError, Error};
use sonoprobe::proto::codec::{decode, encode};
use sonoprobe::proto::command::{Command, CommandId};

use crate::mock_hw::{BoardCall, TestRig, host_addr};

fn rig() -> TestRig {
    let mut rig = TestRig::new(ProbeConfig::default());
    rig.service.set_peer(host_addr());
    rig
}

// ── End-to-end scenario A: ping ───────────────────────────────

#[test]
fn ping_batch_replies_once() {
    let mut rig = rig();

    // count=1, id=ping, argsLength=0
    let wire = [1u8, 0, 0, 0, 0];
    let batch = decode(&wire).unwrap();
    rig.service.execute_batch(&batch).unwrap();

    let sent = rig.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, b"SonoProbe 1");
    assert_eq!(sent[0].1, host_addr());
}

#[test]
fn ping_without_peer_fails() {
    let mut rig = TestRig::new(ProbeConfig::default());
    let cmd = Command {
        id: CommandId::Ping,
        args: &[],
    };
    assert!(rig.service.execute_one(&cmd).is_err());
    assert!(rig.sent.borrow().is_empty());
}

// ── Minimum-length contract ───────────────────────────────────

#[test]
fn short_args_abort_batch_after_prior_commands_ran() {
    let mut rig = rig();

    let sleep_args = 5u32.to_le_bytes();
    let commands = [
        Command {
            id: CommandId::SelectMux,
            args: &[MuxTarget::FrontEnd as u8],
        },
        Command {
            id: CommandId::SleepMs,
            args: &sleep_args,
        },
        // enable-replies requires one byte; this one is empty.
        Command {
            id: CommandId::EnableReplies,
            args: &[],
        },
        Command {
            id: CommandId::Ping,
            args: &[],
        },
    ];
    let wire = encode(&commands).unwrap();
    let batch = decode(&wire).unwrap();

    let result = rig.service.execute_batch(&batch);
    assert_eq!(result, Err(Error::Dispatch(DispatchError::InvalidArgument)));

    // The first two commands took effect.
    let calls = rig.board_calls.borrow();
    assert_eq!(
        calls.as_slice(),
        &[
            BoardCall::SelectMux(MuxTarget::FrontEnd),
            BoardCall::DelayMs(5),
        ]
    );
    // The third stopped the batch: no flag change, no ping reply.
    assert!(!rig.service.replies_enabled());
    assert!(rig.sent.borrow().is_empty());
}

// ── Simple handlers ───────────────────────────────────────────

#[test]
fn enable_replies_latches_flag() {
    let mut rig = rig();

    let on = Command {
        id: CommandId::EnableReplies,
        args: &[1],
    };
    rig.service.execute_one(&on).unwrap();
    assert!(rig.service.replies_enabled());

    let off = Command {
        id: CommandId::EnableReplies,
        args: &[0],
    };
    rig.service.execute_one(&off).unwrap();
    assert!(!rig.service.replies_enabled());
}

#[test]
fn select_mux_routes_known_targets_and_ignores_unknown() {
    let mut rig = rig();

    let select = Command {
        id: CommandId::SelectMux,
        args: &[MuxTarget::TxDriver as u8],
    };
    rig.service.execute_one(&select).unwrap();

    let bogus = Command {
        id: CommandId::SelectMux,
        args: &[0xEE],
    };
    rig.service.execute_one(&bogus).unwrap();

    assert_eq!(
        rig.board_calls.borrow().as_slice(),
        &[BoardCall::SelectMux(MuxTarget::TxDriver)]
    );
}

#[test]
fn write_bus_transfers_raw_args() {
    let mut rig = rig();

    let cmd = Command {
        id: CommandId::WriteBus,
        args: &[0xDE, 0xAD, 0xBE, 0xEF],
    };
    rig.service.execute_one(&cmd).unwrap();

    let log = rig.bus_log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(
        log[0],
        crate::mock_hw::BusOp::Transfer {
            opcode: 0xDE,
            len: 4,
            wait: true,
        }
    );
}

#[test]
fn delay_and_sleep_use_the_board_clock() {
    let mut rig = rig();

    let ns_args = 2400u32.to_le_bytes();
    let mut delay_args = [0u8; 8];
    delay_args[..4].copy_from_slice(&ns_args);
    let delay = Command {
        id: CommandId::DelayNs,
        args: &delay_args,
    };
    rig.service.execute_one(&delay).unwrap();

    let ms_args = 120u32.to_le_bytes();
    let sleep = Command {
        id: CommandId::SleepMs,
        args: &ms_args,
    };
    rig.service.execute_one(&sleep).unwrap();

    assert_eq!(
        rig.board_calls.borrow().as_slice(),
        &[BoardCall::DelayNs(2400), BoardCall::DelayMs(120)]
    );
}

#[test]
fn set_power_domain_toggles_rail() {
    let mut rig = rig();

    let cmd = Command {
        id: CommandId::SetPowerDomain,
        args: &[PowerDomain::NegHv as u8, 1],
    };
    rig.service.execute_one(&cmd).unwrap();

    assert_eq!(
        rig.board_calls.borrow().as_slice(),
        &[BoardCall::SetPower(PowerDomain::NegHv, true)]
    );
}

// ── Verified register writes ──────────────────────────────────

#[test]
fn write_fabric_verifies_read_back() {
    let mut rig = rig();

    let mut args = [0u8; 5];
    args[0] = 7;
    args[1..5].copy_from_slice(&0x0000_02F8u32.to_le_bytes());
    let cmd = Command {
        id: CommandId::WriteFabric,
        args: &args,
    };
    rig.service.execute_one(&cmd).unwrap();

    // write + flush + drain + queued read + read-back
    let log = rig.bus_log.borrow();
    assert_eq!(log.len(), 5);
}

#[test]
fn fabric_mismatch_is_fatal_under_strict_policy() {
    let config = ProbeConfig {
        verify_policy: VerifyPolicy::Strict,
        ..ProbeConfig::default()
    };
    let mut rig = TestRig::with_options(
        config,
        crate::mock_hw::RigOptions {
            fabric_readback_override: Some(0xBAD0_BEEF),
            ..Default::default()
        },
    );
    rig.service.set_peer(host_addr());

    let mut args = [0u8; 5];
    args[0] = 7;
    args[1..5].copy_from_slice(&0x0000_02F8u32.to_le_bytes());
    let cmd = Command {
        id: CommandId::WriteFabric,
        args: &args,
    };

    match rig.service.execute_one(&cmd) {
        Err(Error::VerifyMismatch {
            addr,
            expected,
            read,
        }) => {
            assert_eq!(addr, 7);
            assert_eq!(expected, 0x0000_02F8);
            assert_eq!(read, 0xBAD0_BEEF);
        }
        other => panic!("expected a verify mismatch, got {other:?}"),
    }
}

#[test]
fn fabric_mismatch_is_logged_only_under_permissive_policy() {
    let mut rig = TestRig::with_options(
        ProbeConfig::default(),
        crate::mock_hw::RigOptions {
            fabric_readback_override: Some(0xBAD0_BEEF),
            ..Default::default()
        },
    );
    rig.service.set_peer(host_addr());

    let mut args = [0u8; 5];
    args[0] = 7;
    args[1..5].copy_from_slice(&0x0000_02F8u32.to_le_bytes());
    let cmd = Command {
        id: CommandId::WriteFabric,
        args: &args,
    };
    assert!(rig.service.execute_one(&cmd).is_ok());
}

#[test]
fn write_front_end_selects_register_space() {
    let mut rig = rig();
    rig.service
        .execute_one(&Command {
            id: CommandId::SelectMux,
            args: &[MuxTarget::FrontEnd as u8],
        })
        .unwrap();

    // Plain space: a single 3-byte frame.
    let mut args = [0u8; 4];
    args[0] = 0;
    args[1] = 0xC7;
    args[2..4].copy_from_slice(&0x0005u16.to_le_bytes());
    rig.service
        .execute_one(&Command {
            id: CommandId::WriteFrontEnd,
            args: &args,
        })
        .unwrap();

    // TGC space: gate on, write, gate off — three frames.
    let mut args = [0u8; 4];
    args[0] = 1;
    args[1] = 0xB5;
    args[2..4].copy_from_slice(&0x0000u16.to_le_bytes());
    rig.service
        .execute_one(&Command {
            id: CommandId::WriteFrontEnd,
            args: &args,
        })
        .unwrap();

    let frames: Vec<usize> = rig
        .bus_log
        .borrow()
        .iter()
        .filter_map(|op| match op {
            crate::mock_hw::BusOp::Transfer { len, .. } => Some(*len),
            crate::mock_hw::BusOp::Await => None,
        })
        .collect();
    assert_eq!(frames, vec![3, 3, 3, 3]);
}

#[test]
fn write_tx_driver_sends_one_packed_frame() {
    let mut rig = rig();
    rig.service
        .execute_one(&Command {
            id: CommandId::SelectMux,
            args: &[MuxTarget::TxDriver as u8],
        })
        .unwrap();

    let mut args = [0u8; 6];
    args[..2].copy_from_slice(&0x0018u16.to_le_bytes());
    args[2..6].copy_from_slice(&0x008C_0003u32.to_le_bytes());
    rig.service
        .execute_one(&Command {
            id: CommandId::WriteTxDriver,
            args: &args,
        })
        .unwrap();

    let log = rig.bus_log.borrow();
    assert!(matches!(
        log.last(),
        Some(crate::mock_hw::BusOp::Transfer { len: 6, wait: true, .. })
    ));
}
