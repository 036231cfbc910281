#![allow(clippy::unwrap_used)]
// Decoding tests for full vendor payloads.

use pretty_assertions::assert_eq;
use serde_json::json;

use pettracer_api::{OpaqueCode, RawDetails, RawDevice, RawPosition, RawTimestamp};

#[test]
fn test_decode_full_device() {
    let payload = json!({
        "id": 12345,
        "bat": 3987,
        "lastPos": {
            "posLat": 52.520_008,
            "posLong": 13.404_954,
            "acc": 8,
            "sat": 9,
            "rssi": -71,
            "timeMeasure": "2024-06-15T10:30:00Z"
        },
        "lastContact": "2024-06-15T10:31:12.345",
        "status": 0,
        "mode": "standby",
        "chg": 1,
        "modeSet": 2,
        "search": false,
        "details": { "name": "Mira", "color": 3 },
        "hwVersion": "4.1"
    });

    let device: RawDevice = serde_json::from_value(payload).unwrap();

    assert_eq!(device.id.as_deref(), Some("12345"));
    assert_eq!(device.bat, Some(3987));
    assert_eq!(
        device.last_pos,
        Some(RawPosition {
            pos_lat: 52.520_008,
            pos_long: 13.404_954,
            acc: Some(8),
            sat: Some(9),
            rssi: Some(-71),
            time_measure: Some(RawTimestamp::At(
                "2024-06-15T10:30:00Z".parse().unwrap()
            )),
        })
    );
    // No offset: not RFC 3339, left for the consumer to coerce.
    assert_eq!(
        device.last_contact,
        Some(RawTimestamp::Text("2024-06-15T10:31:12.345".into()))
    );
    assert_eq!(device.status, Some(OpaqueCode::Int(0)));
    assert_eq!(device.mode, Some(OpaqueCode::Text("standby".into())));
    assert_eq!(device.chg, Some(1));
    assert_eq!(device.mode_set, Some(2));
    assert_eq!(device.search, Some(false));
    assert_eq!(
        device.details,
        Some(RawDetails {
            name: Some("Mira".into())
        })
    );
}

#[test]
fn test_decode_sparse_device_list() {
    let payload = json!([
        { "id": "A" },
        { "bat": 3300 },
        { "id": "", "bat": 4000 }
    ]);

    let devices: Vec<RawDevice> = serde_json::from_value(payload).unwrap();

    assert_eq!(devices.len(), 3);
    assert_eq!(devices[0], RawDevice {
        id: Some("A".into()),
        ..RawDevice::default()
    });
    assert!(devices[1].id.is_none());
    assert_eq!(devices[2].id.as_deref(), Some(""));
}

#[test]
fn test_one_odd_collar_does_not_sink_the_list() {
    let payload = json!([
        { "id": "A", "bat": 3700 },
        { "id": "B", "lastContact": 1_717_000_000 },
        { "id": "C", "bat": 3700.0, "lastPos": { "posLat": null, "posLong": 13.4 } },
        { "id": "D", "search": "maybe", "modeSet": "fast", "details": { "name": 5 } }
    ]);

    let devices: Vec<RawDevice> = serde_json::from_value(payload).unwrap();

    assert_eq!(devices.len(), 4);
    assert_eq!(devices[0].bat, Some(3700));
    assert_eq!(devices[1].last_contact, Some(RawTimestamp::Epoch(1_717_000_000)));
    assert_eq!(devices[2].bat, Some(3700));
    assert!(devices[2].last_pos.is_none());
    assert_eq!(devices[3], RawDevice {
        id: Some("D".into()),
        details: Some(RawDetails { name: None }),
        ..RawDevice::default()
    });
}

#[test]
fn test_malformed_body_maps_to_deserialization_error() {
    let err: pettracer_api::Error = serde_json::from_str::<Vec<RawDevice>>("{not json")
        .unwrap_err()
        .into();
    assert!(matches!(err, pettracer_api::Error::Deserialization { .. }));
    assert!(err.is_transient());
}
