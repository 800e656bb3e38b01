//! Front-end bring-up sequence against the register-level chip simulators.

use sonoprobe::app::ports::{LinkMode, MuxTarget, PowerDomain};
use sonoprobe::config::ProbeConfig;

use crate::mock_hw::{BoardCall, TestRig};

#[test]
fn bring_up_succeeds_against_the_simulated_chips() {
    let mut rig = TestRig::new(ProbeConfig::default());
    rig.service.initialize().unwrap();
}

#[test]
fn bring_up_starts_with_a_fabric_reset() {
    let mut rig = TestRig::new(ProbeConfig::default());
    rig.service.initialize().unwrap();

    let calls = rig.board_calls.borrow();
    assert_eq!(calls.first(), Some(&BoardCall::PulseReset));
}

#[test]
fn bring_up_visits_every_chip_in_order() {
    let mut rig = TestRig::new(ProbeConfig::default());
    rig.service.initialize().unwrap();

    let muxes: Vec<MuxTarget> = rig
        .board_calls
        .borrow()
        .iter()
        .filter_map(|call| match call {
            BoardCall::SelectMux(target) => Some(*target),
            _ => None,
        })
        .collect();
    assert_eq!(
        muxes,
        vec![
            MuxTarget::Fabric,
            MuxTarget::TxDriver,
            MuxTarget::FrontEnd,
            MuxTarget::Fabric,
        ]
    );
}

#[test]
fn bring_up_raises_the_pulser_rails() {
    let mut rig = TestRig::new(ProbeConfig::default());
    rig.service.initialize().unwrap();

    let rails: Vec<(PowerDomain, bool)> = rig
        .board_calls
        .borrow()
        .iter()
        .filter_map(|call| match call {
            BoardCall::SetPower(domain, enabled) => Some((*domain, *enabled)),
            _ => None,
        })
        .collect();
    assert_eq!(
        rails,
        vec![
            (PowerDomain::PosHv, true),
            (PowerDomain::NegHv, true),
            (PowerDomain::Neg5V, true),
        ]
    );
}

#[test]
fn bring_up_ends_in_low_power_mode() {
    let mut rig = TestRig::new(ProbeConfig::default());
    rig.service.initialize().unwrap();

    assert_eq!(rig.link_modes(), vec![LinkMode::LowPower]);
}

#[test]
fn bring_up_configures_all_three_chips() {
    let mut rig = TestRig::new(ProbeConfig::default());
    rig.service.initialize().unwrap();

    let log = rig.bus_log.borrow();
    let frames_of = |len: usize| {
        log.iter()
            .filter(|op| {
                matches!(
                    op,
                    crate::mock_hw::BusOp::Transfer { len: l, .. } if *l == len
                )
            })
            .count()
    };

    // 2-byte CFG write during the fabric handshake.
    assert!(frames_of(2) >= 1);
    // 8-byte fabric register frames: 10 default registers, verified, plus
    // the reset/release/clock-gating writes.
    assert!(frames_of(8) >= 10 * 2);
    // 3-byte AFE frames: 78 + 23 verified registers plus gating traffic.
    assert!(frames_of(3) > 101 * 2);
    // 6-byte TX frames: 16 channel delays plus the mode/pattern sequence.
    assert!(frames_of(6) > 16);
}
