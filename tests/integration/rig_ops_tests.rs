//! Rig-control operations after a successful open.

use flrig_link::Error;
use flrig_link::app::{ExtParm, Func, Level, LevelValue, Vfo};
use flrig_link::config::LinkConfig;
use flrig_link::rpc::Mode;

use super::mock_link::{
    calls_since, fault, flrig_mock, last_envelope, ok_array, ok_i4, ok_value, open_with, opened,
    unknown_method,
};

fn mark(rig: &super::mock_link::TestRig) -> usize {
    rig.transport().calls().len()
}

// ── Frequency ─────────────────────────────────────────────────

#[test]
fn set_freq_sends_whole_hertz() {
    let mut rig = opened();
    let m = mark(&rig);

    rig.set_freq(Vfo::A, 14_074_000.0).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.set_vfoA"]);
    assert!(last_envelope(&rig).contains("<value><double>14074000</double></value>"));
    assert!((rig.state().a.freq - 14_074_000.0).abs() < f64::EPSILON);
}

#[test]
fn rejected_set_freq_leaves_state_alone() {
    let mut t = flrig_mock("1.4.7");
    t.route("rig.set_vfoA", fault(-32500, "frequency out of range"));
    let mut rig = open_with(t, &LinkConfig::default());

    assert_eq!(rig.set_freq(Vfo::A, 99_000_000.0), Err(Error::NoValue));
    assert!((rig.state().a.freq - 14_074_000.0).abs() < f64::EPSILON);
}

#[test]
fn rejected_ptt_leaves_state_alone() {
    let mut t = flrig_mock("1.4.7");
    t.route("rig.set_ptt", fault(-32500, "tx inhibited"));
    let mut rig = open_with(t, &LinkConfig::default());

    assert_eq!(rig.set_ptt(true), Err(Error::NoValue));
    assert!(!rig.state().ptt);
}

#[test]
fn set_freq_current_follows_selected_vfo() {
    let mut t = flrig_mock("1.4.7");
    t.route("rig.get_AB", ok_value("B"));
    let mut rig = open_with(t, &LinkConfig::default());
    let m = mark(&rig);

    rig.set_freq(Vfo::Current, 7_040_000.0).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.set_vfoB"]);
}

#[test]
fn verify_freq_uses_verified_setter() {
    let mut rig = opened();
    rig.set_ext_parm(ExtParm::VerifyFreq, true).unwrap();
    let m = mark(&rig);

    rig.set_freq(Vfo::B, 7_074_000.0).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.set_verify_vfoB"]);
}

#[test]
fn invalid_frequency_is_rejected_without_a_call() {
    let mut rig = opened();
    let m = mark(&rig);
    assert!(matches!(rig.set_freq(Vfo::A, 0.0), Err(Error::InvalidArgument(_))));
    assert!(matches!(rig.set_freq(Vfo::A, f64::NAN), Err(Error::InvalidArgument(_))));
    assert!(calls_since(&rig, m).is_empty());
}

#[test]
fn get_freq_reads_and_caches_vfo_b() {
    let mut rig = opened();
    let m = mark(&rig);

    let hz = rig.get_freq(Vfo::B).unwrap();
    assert!((hz - 7_074_000.0).abs() < f64::EPSILON);
    assert_eq!(calls_since(&rig, m), ["rig.get_vfoB"]);
    assert!((rig.state().b.freq - 7_074_000.0).abs() < f64::EPSILON);
}

#[test]
fn non_numeric_frequency_is_protocol_error() {
    let mut t = flrig_mock("1.4.7");
    t.route("rig.get_vfoB", ok_value("abc"));
    let mut rig = open_with(t, &LinkConfig::default());
    assert_eq!(rig.get_freq(Vfo::B), Err(Error::Protocol));
}

// ── Mode ──────────────────────────────────────────────────────

#[test]
fn set_mode_sends_first_alias_and_width() {
    let mut rig = opened();
    let m = mark(&rig);

    rig.set_mode(Vfo::A, Mode::PktUsb, 3000).unwrap();
    let calls = calls_since(&rig, m);
    assert_eq!(calls, ["rig.set_modeA", "rig.set_bwA"]);
    let envs = rig.transport().envelopes();
    assert!(envs[envs.len() - 2].contains("<value>USB-D</value>"));
    assert!(envs[envs.len() - 1].contains("<value><i4>3000</i4></value>"));
    assert_eq!(rig.state().a.mode, Some(Mode::PktUsb));
    assert_eq!(rig.state().a.width, 3000);

    // Same width again: no bandwidth call.
    let m = mark(&rig);
    rig.set_mode(Vfo::A, Mode::Usb, 3000).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.set_modeA"]);
}

#[test]
fn set_mode_zero_width_leaves_passband() {
    let mut rig = opened();
    let m = mark(&rig);
    rig.set_mode(Vfo::B, Mode::Cw, 0).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.set_modeB"]);
}

#[test]
fn set_mode_rejects_mode_the_rig_lacks() {
    let mut rig = opened();
    let m = mark(&rig);
    assert!(matches!(
        rig.set_mode(Vfo::A, Mode::C4fm, 0),
        Err(Error::InvalidArgument(_))
    ));
    assert!(calls_since(&rig, m).is_empty());
}

#[test]
fn set_mode_falls_back_to_shared_bandwidth_call() {
    let mut t = flrig_mock("1.4.7");
    t.route("rig.set_bwA", unknown_method("rig.set_bwA"));
    let mut rig = open_with(t, &LinkConfig::default());
    let m = mark(&rig);

    rig.set_mode(Vfo::A, Mode::Lsb, 2700).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.set_modeA", "rig.set_bw"]);
}

#[test]
fn set_mode_on_b_swaps_vfo_without_per_vfo_bandwidth() {
    let mut t = flrig_mock("1.4.7");
    t.route("rig.get_bwA", unknown_method("rig.get_bwA"));
    let mut rig = open_with(t, &LinkConfig::default());
    let m = mark(&rig);

    rig.set_mode(Vfo::B, Mode::Lsb, 0).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.set_AB", "rig.set_modeB", "rig.set_AB"]);
    assert_eq!(rig.state().current_vfo, Vfo::A);
}

#[test]
fn set_mode_is_ignored_while_transmitting() {
    let mut rig = opened();
    rig.set_ptt(true).unwrap();
    let m = mark(&rig);
    rig.set_mode(Vfo::A, Mode::Am, 6000).unwrap();
    assert!(calls_since(&rig, m).is_empty());
}

#[test]
fn get_mode_returns_canonical_mode_and_width() {
    let mut rig = opened();
    let m = mark(&rig);

    assert_eq!(rig.get_mode(Vfo::A), Ok((Some(Mode::Usb), 2400)));
    assert_eq!(calls_since(&rig, m), ["rig.get_modeA", "rig.get_bwA"]);
    assert_eq!(rig.get_mode(Vfo::B), Ok((Some(Mode::Lsb), 2700)));
}

#[test]
fn get_mode_takes_upper_edge_of_passband_pair() {
    let mut t = flrig_mock("1.4.7");
    t.route("rig.get_bwA", ok_array(&["300", "2700"]));
    let mut rig = open_with(t, &LinkConfig::default());
    assert_eq!(rig.get_mode(Vfo::A), Ok((Some(Mode::Usb), 2700)));
}

#[test]
fn get_mode_reports_unmapped_name_as_none() {
    let mut t = flrig_mock("1.4.7");
    t.route("rig.get_modeB", ok_value("DRM"));
    let mut rig = open_with(t, &LinkConfig::default());
    assert_eq!(rig.get_mode(Vfo::B), Ok((None, 2700)));
}

#[test]
fn get_mode_on_old_rig_swaps_vfo() {
    let mut t = flrig_mock("1.3.40");
    t.route("rig.get_modeA", unknown_method("rig.get_modeA"))
        .route("rig.get_bwA", unknown_method("rig.get_bwA"))
        .route("rig.get_mode", ok_value("LSB"))
        .route("rig.get_bw", ok_value("2700"));
    let mut rig = open_with(t, &LinkConfig::default());
    let m = mark(&rig);

    assert_eq!(rig.get_mode(Vfo::B), Ok((Some(Mode::Lsb), 2700)));
    assert_eq!(
        calls_since(&rig, m),
        ["rig.set_AB", "rig.get_mode", "rig.get_bw", "rig.set_AB"]
    );
}

// ── VFO ───────────────────────────────────────────────────────

#[test]
fn set_vfo_sends_letter() {
    let mut rig = opened();
    let m = mark(&rig);

    rig.set_vfo(Vfo::B).unwrap();
    assert!(last_envelope(&rig).contains("<value>B</value>"));
    rig.set_vfo(Vfo::Tx).unwrap();
    assert!(last_envelope(&rig).contains("<value>B</value>"));
    assert_eq!(calls_since(&rig, m), ["rig.set_AB", "rig.set_AB"]);
    assert_eq!(rig.state().current_vfo, Vfo::B);
}

#[test]
fn selecting_a_reasserts_split() {
    let mut t = flrig_mock("1.4.7");
    t.route("rig.get_split", ok_i4(1));
    let mut rig = open_with(t, &LinkConfig::default());
    let m = mark(&rig);

    rig.set_vfo(Vfo::A).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.set_AB", "rig.set_split"]);
    assert!(last_envelope(&rig).contains("<i4>1</i4>"));
}

#[test]
fn get_vfo_parses_letter() {
    let mut rig = opened();
    assert_eq!(rig.get_vfo(), Ok(Vfo::A));

    rig.transport_mut().route("rig.get_AB", ok_value("B"));
    assert_eq!(rig.get_vfo(), Ok(Vfo::B));
    assert_eq!(rig.state().current_vfo, Vfo::B);

    rig.transport_mut().route("rig.get_AB", ok_value("X"));
    assert_eq!(rig.get_vfo(), Err(Error::Protocol));
}

// ── PTT ───────────────────────────────────────────────────────

#[test]
fn ptt_on_and_off() {
    let mut rig = opened();
    let m = mark(&rig);

    rig.set_ptt(true).unwrap();
    assert!(last_envelope(&rig).contains("<i4>1</i4>"));
    assert!(rig.state().ptt);
    rig.set_ptt(false).unwrap();
    assert!(last_envelope(&rig).contains("<i4>0</i4>"));
    assert_eq!(calls_since(&rig, m), ["rig.set_ptt", "rig.set_ptt"]);
}

#[test]
fn verify_ptt_uses_fast_ptt() {
    let config = LinkConfig {
        verify_ptt: true,
        ..LinkConfig::default()
    };
    let mut rig = open_with(flrig_mock("1.3.54"), &config);
    let m = mark(&rig);
    rig.set_ptt(true).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.set_ptt_fast"]);
}

#[test]
fn get_ptt_reads_state() {
    let mut rig = opened();
    assert_eq!(rig.get_ptt(), Ok(false));
    rig.transport_mut().route("rig.get_ptt", ok_i4(1));
    assert_eq!(rig.get_ptt(), Ok(true));
    assert!(rig.state().ptt);
}

// ── Split ─────────────────────────────────────────────────────

#[test]
fn enabling_split_sets_it_once() {
    let mut rig = opened();
    let m = mark(&rig);

    rig.set_split_vfo(true).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.get_split", "rig.set_split"]);
    assert!(rig.state().split);
}

#[test]
fn split_already_matching_is_not_sent() {
    let mut rig = opened();
    let m = mark(&rig);
    rig.set_split_vfo(false).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.get_split"]);
}

#[test]
fn get_split_reports_tx_vfo() {
    let mut rig = opened();
    rig.transport_mut().route("rig.get_split", ok_i4(1));
    let split = rig.get_split_vfo().unwrap();
    assert!(split.enabled);
    assert_eq!(split.tx_vfo, Vfo::B);
}

#[test]
fn split_freq_skips_unchanged_value() {
    let mut rig = opened();
    let m = mark(&rig);

    rig.set_split_freq(7_074_000.0).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.get_vfoB"]);

    let m = mark(&rig);
    rig.set_split_freq(7_075_000.0).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.get_vfoB", "rig.set_vfoB"]);
    assert!(last_envelope(&rig).contains("<double>7075000.000000</double>"));
}

#[test]
fn get_split_freq_reads_vfo_b() {
    let mut rig = opened();
    let hz = rig.get_split_freq().unwrap();
    assert!((hz - 7_074_000.0).abs() < f64::EPSILON);
}

#[test]
fn split_freq_mode_sets_b_then_reselects_a() {
    let mut rig = opened();
    let m = mark(&rig);

    rig.set_split_freq_mode(7_080_000.0, Mode::Usb, 0).unwrap();
    assert_eq!(
        calls_since(&rig, m),
        ["rig.set_vfoB", "rig.get_modeB", "rig.get_bwB", "rig.set_modeB", "rig.set_AB"]
    );
}

#[test]
fn split_freq_mode_skips_matching_mode() {
    let mut rig = opened();
    let m = mark(&rig);
    rig.set_split_freq_mode(7_080_000.0, Mode::Lsb, 0).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.set_vfoB", "rig.get_modeB", "rig.get_bwB"]);
}

#[test]
fn split_freq_mode_is_read_from_tx_vfo_only() {
    let mut rig = opened();
    assert!(matches!(
        rig.get_split_freq_mode(Vfo::A),
        Err(Error::InvalidArgument(_))
    ));
    let (hz, mode, width) = rig.get_split_freq_mode(Vfo::Tx).unwrap();
    assert!((hz - 7_074_000.0).abs() < f64::EPSILON);
    assert_eq!(mode, Some(Mode::Lsb));
    assert_eq!(width, 2700);
}

// ── Levels, functions, raw commands ───────────────────────────

#[test]
fn set_level_sends_percent() {
    let mut rig = opened();
    let m = mark(&rig);

    rig.set_level(Level::RfPower, 0.5).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.set_power"]);
    assert!(last_envelope(&rig).contains("<i4>50</i4>"));
}

#[test]
fn read_only_levels_cannot_be_set() {
    let mut rig = opened();
    assert!(matches!(
        rig.set_level(Level::Strength, 0.5),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn levels_are_scaled_on_read() {
    let mut rig = opened();
    assert_eq!(rig.get_level(Level::Strength), Ok(LevelValue::Int(6)));
    assert_eq!(rig.get_level(Level::RfPower), Ok(LevelValue::Float(50.0)));
    assert_eq!(rig.get_level(Level::Af), Ok(LevelValue::Float(0.75)));
}

#[test]
fn tuner_function_starts_tune() {
    let mut rig = opened();
    let m = mark(&rig);
    rig.set_func(Func::Tuner, true).unwrap();
    assert_eq!(calls_since(&rig, m), ["rig.tune"]);
    assert!(last_envelope(&rig).contains("<value>1</value>"));
}

#[test]
fn unavailable_method_surfaces_unsupported() {
    let mut rig = opened();
    rig.transport_mut().route("rig.tune", unknown_method("rig.tune"));
    assert_eq!(rig.set_func(Func::Tuner, true), Err(Error::Unsupported));
}

#[test]
fn cat_string_is_passed_through() {
    let mut rig = opened();
    rig.cat_string("FA00014074000;").unwrap();
    assert!(last_envelope(&rig).contains("<methodName>rig.cat_string</methodName>"));
    assert!(last_envelope(&rig).contains("<value>FA00014074000;</value>"));
}

#[test]
fn cat_string_rejects_markup_and_empty_input() {
    let mut rig = opened();
    let m = mark(&rig);
    assert!(rig.cat_string("").is_err());
    assert!(rig.cat_string("<x>").is_err());
    assert!(rig.cat_string("a&b").is_err());
    assert!(calls_since(&rig, m).is_empty());
}

// ── Power conversion and backend parameters ───────────────────

#[test]
fn power_conversion_uses_meter_scale() {
    let rig = opened();
    assert_eq!(rig.power_to_mw(0.5), 50_000);
    assert_eq!(rig.power_to_mw(1.5), 100_000);
    assert!((rig.mw_to_power(25_000) - 0.25).abs() < f32::EPSILON);
    assert!((rig.mw_to_power(500_000) - 1.0).abs() < f32::EPSILON);
}

#[test]
fn ext_parms_need_new_flrig() {
    let mut old = open_with(flrig_mock("1.3.40"), &LinkConfig::default());
    assert!(matches!(
        old.set_ext_parm(ExtParm::VerifyPtt, true),
        Err(Error::InvalidArgument(_))
    ));
    assert!(old.set_ext_parm(ExtParm::VerifyPtt, false).is_ok());

    let mut new = opened();
    new.set_ext_parm(ExtParm::VerifyPtt, true).unwrap();
    assert!(new.get_ext_parm(ExtParm::VerifyPtt));
    assert!(!new.get_ext_parm(ExtParm::VerifyFreq));
}
