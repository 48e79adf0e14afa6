//! End-to-end reconnaissance and flood runs against a simulated fleet.

use std::thread;
use std::time::Duration;

use tagflood::codec::{PID_FIELD_COUNT, PID_FIELD_NAMES};
use tagflood::simulator::{SimulatedDevice, SimulatedFleet};
use tagflood::{
    CancelToken, ClientConfig, DeviceSnapshot, FloodConfig, FloodEngine, FloodPlan, FloodRow,
    JsonWorkbook, Reconnaissance, TabularStore, TagError, TagValue,
};

fn counter(pre: i32) -> TagValue {
    let mut data = 0x8000_0000u32.to_le_bytes().to_vec();
    data.extend_from_slice(&pre.to_le_bytes());
    data.extend_from_slice(&3i32.to_le_bytes());
    TagValue::Raw(data)
}

fn pid() -> TagValue {
    let mut data = 0u32.to_le_bytes().to_vec();
    for i in 0..12 {
        data.extend_from_slice(&(i as f32 * 10.0).to_le_bytes());
    }
    TagValue::Raw(data)
}

fn plant(fleet: &SimulatedFleet, ip: &str) {
    fleet.insert(
        ip,
        SimulatedDevice::new()
            .with_tag("Program:Main.A", "COUNTER", counter(100))
            .with_tag("Program:Main.B", "PID", pid())
            .with_tag("Program:Main.C", "DINT", TagValue::Int(42))
            .with_tag("Controller.Hidden", "DINT", TagValue::Int(0)),
    );
}

#[test]
fn test_recon_order_and_expansion() {
    let fleet = SimulatedFleet::new();
    plant(&fleet, "10.0.0.1");

    let report = Reconnaissance::new(&fleet, ClientConfig::default()).run(&["10.0.0.1"]);
    let rows = &report.snapshots[0].rows;

    let mut expected = vec!["Program:Main.A.PRE".to_string()];
    expected.extend(PID_FIELD_NAMES.iter().map(|f| format!("Program:Main.B.{}", f)));
    expected.push("Program:Main.C".to_string());

    let names: Vec<&str> = rows.iter().map(|row| row.tag.as_str()).collect();
    assert_eq!(names, expected);
    assert_eq!(rows.len(), PID_FIELD_COUNT + 2);
    assert_eq!(rows[0].value, TagValue::Int(100));
    assert_eq!(rows[2].value, TagValue::Real(10.0));
    assert_eq!(rows[PID_FIELD_COUNT + 1].value, TagValue::Int(42));
    assert!(rows.iter().all(|row| row.step.is_none() && row.start_value.is_none()));
}

#[test]
fn test_fleet_isolation_keeps_order() {
    let fleet = SimulatedFleet::new();
    plant(&fleet, "10.0.0.1");
    fleet.insert("10.0.0.2", SimulatedDevice::new().with_list_timeout());
    plant(&fleet, "10.0.0.3");

    let report = Reconnaissance::new(&fleet, ClientConfig::default())
        .run(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]);

    let ips: Vec<&str> = report.snapshots.iter().map(|s| s.ip.as_str()).collect();
    assert_eq!(ips, ["10.0.0.1", "10.0.0.3"]);
    assert_eq!(report.unresponsive.len(), 1);
    assert_eq!(report.unresponsive[0].0, "10.0.0.2");
    assert!(matches!(report.unresponsive[0].1, TagError::Timeout));
}

#[test]
fn test_recon_runs_do_not_accumulate() {
    let fleet = SimulatedFleet::new();
    plant(&fleet, "10.0.0.1");
    let recon = Reconnaissance::new(&fleet, ClientConfig::default());

    let first = recon.run(&["10.0.0.1"]);
    let second = recon.run(&["10.0.0.1"]);
    assert_eq!(first.snapshots, second.snapshots);
}

#[test]
fn test_emulator_slot_passed_through() {
    let fleet = SimulatedFleet::new();
    fleet.insert(
        "10.0.0.1",
        SimulatedDevice::new()
            .with_required_slot(2)
            .with_tag("Program:Main.C", "DINT", TagValue::Int(1)),
    );

    let plain = Reconnaissance::new(&fleet, ClientConfig::default()).run(&["10.0.0.1"]);
    assert!(plain.is_empty());

    let emulated =
        Reconnaissance::new(&fleet, ClientConfig::default().emulated()).run(&["10.0.0.1"]);
    assert_eq!(emulated.snapshots.len(), 1);
}

#[test]
fn test_unresponsive_fleet_writes_no_artifact() {
    let fleet = SimulatedFleet::new();
    fleet.insert("10.0.0.1", SimulatedDevice::unreachable());
    let dir = tempfile::tempdir().unwrap();
    let store = JsonWorkbook::new(dir.path().join("tags.json"));

    let report =
        Reconnaissance::new(&fleet, ClientConfig::default()).run(&["10.0.0.1", "10.0.0.9"]);
    assert!(matches!(report.persist(&store), Err(TagError::EmptyResult)));
    assert!(!store.path().exists());
}

#[test]
fn test_recon_edit_flood_cycle() {
    let fleet = SimulatedFleet::new();
    plant(&fleet, "10.0.0.1");
    let dir = tempfile::tempdir().unwrap();
    let store = JsonWorkbook::new(dir.path().join("tags.json"));

    Reconnaissance::new(&fleet, ClientConfig::default())
        .run(&["10.0.0.1"])
        .persist(&store)
        .unwrap();

    // operator edit: ramp the counter preset, pin the DINT
    let mut sheets = store.read_snapshots().unwrap();
    let rows = &mut sheets[0].rows;
    rows[0].step = Some(TagValue::Int(2));
    rows[0].start_value = Some(TagValue::Int(10));
    rows.retain(|row| row.tag == "Program:Main.A.PRE" || row.tag == "Program:Main.C");
    rows[1].value = TagValue::Int(7);
    // the flood writes to the sub-tag names reported by reconnaissance
    fleet.insert(
        "10.0.0.1",
        SimulatedDevice::new()
            .with_tag("Program:Main.A.PRE", "COUNTER", TagValue::Int(100))
            .with_tag("Program:Main.C", "DINT", TagValue::Int(42)),
    );
    store.write_snapshots(&sheets).unwrap();

    let plan = FloodPlan::load(&store).unwrap();
    let config = FloodConfig::default().with_max_iterations(2);
    let mut engine = FloodEngine::new(&fleet, ClientConfig::default(), plan, config).unwrap();
    let summary = engine.run(&CancelToken::new());

    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.rows_written, 4);
    let device = fleet.device("10.0.0.1").unwrap();
    assert_eq!(
        device.writes_to("Program:Main.A.PRE"),
        [TagValue::Int(10), TagValue::Int(12)]
    );
    assert_eq!(
        device.writes_to("Program:Main.C"),
        [TagValue::Int(7), TagValue::Int(7)]
    );
    assert_eq!(
        engine.plan().devices()[0].rows[0].start_value,
        Some(TagValue::Int(14))
    );
}

#[test]
fn test_ramp_state_after_first_iteration() {
    let fleet = SimulatedFleet::new();
    fleet.insert(
        "10.0.0.1",
        SimulatedDevice::new().with_tag("T", "DINT", TagValue::Int(0)),
    );
    let plan = FloodPlan::new(vec![DeviceSnapshot {
        ip: "10.0.0.1".into(),
        rows: vec![FloodRow::new("T", "DINT", TagValue::Int(0))
            .with_ramp(TagValue::Int(10), TagValue::Int(2))],
    }]);
    let mut engine =
        FloodEngine::new(&fleet, ClientConfig::default(), plan, FloodConfig::default()).unwrap();

    engine.inject_once();
    assert_eq!(
        engine.plan().devices()[0].rows[0].start_value,
        Some(TagValue::Int(12))
    );
    engine.inject_once();
    assert_eq!(
        fleet.device("10.0.0.1").unwrap().writes_to("T"),
        [TagValue::Int(10), TagValue::Int(12)]
    );
}

#[test]
fn test_cancel_stops_between_iterations() {
    let fleet = SimulatedFleet::new();
    fleet.insert(
        "10.0.0.1",
        SimulatedDevice::new()
            .with_tag("A", "DINT", TagValue::Int(0))
            .with_tag("B", "DINT", TagValue::Int(0)),
    );
    let plan = FloodPlan::new(vec![DeviceSnapshot {
        ip: "10.0.0.1".into(),
        rows: vec![
            FloodRow::new("A", "DINT", TagValue::Int(1)),
            FloodRow::new("B", "DINT", TagValue::Int(2)),
        ],
    }]);
    let config = FloodConfig::new(Duration::from_millis(5));
    let mut engine =
        FloodEngine::new(fleet.clone(), ClientConfig::default(), plan, config).unwrap();

    let cancel = CancelToken::new();
    let handle = {
        let cancel = cancel.clone();
        thread::spawn(move || engine.run(&cancel))
    };
    thread::sleep(Duration::from_millis(40));
    cancel.cancel();
    let summary = handle.join().unwrap();

    assert!(summary.iterations >= 1);
    let device = fleet.device("10.0.0.1").unwrap();
    // every started iteration wrote both rows
    assert_eq!(device.writes_to("A").len(), device.writes_to("B").len());
    assert_eq!(device.writes_to("A").len() as u64, summary.iterations);
    assert_eq!(device.value("A"), Some(&TagValue::Int(1)));
}
