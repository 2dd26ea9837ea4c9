//! Discovery filter tests
//!
//! The engine must find a peer iff at least one advertisement matches the
//! name AND the service, regardless of what else is on the air.

use std::time::Duration;

use proptest::prelude::*;
use sensorlink_core::protocol::{
    ADVERTISED_SERVICE_UUID, DEVICE_INFO_SERVICE_UUID, SENSOR_SERVICE_UUID,
};
use sensorlink_core::{Advertisement, CentralConfig, DiscoveryEngine, PeerAddress, PeerDescriptor};
use sensorlink_harness::{SimulatedAir, CENTRAL_ADDRESS};
use tokio::time::Instant;

const TARGET_ADDRESS: PeerAddress = PeerAddress::new([0xAA, 0, 0, 0, 0, 0x01]);

fn target() -> Advertisement {
    Advertisement {
        address: TARGET_ADDRESS,
        local_name: Some("sensor".to_string()),
        services: vec![ADVERTISED_SERVICE_UUID],
        appearance: Some(0x054F),
        rssi: Some(-60),
    }
}

/// Generate an advertisement that may or may not match the filter
fn arb_advertisement() -> impl Strategy<Value = Advertisement> {
    let names = prop_oneof![
        Just(None),
        Just(Some("sensor".to_string())),
        Just(Some("sensor2".to_string())),
        Just(Some("Sensor".to_string())),
        Just(Some("thermo".to_string())),
    ];
    let services = prop::sample::subsequence(
        vec![
            ADVERTISED_SERVICE_UUID,
            SENSOR_SERVICE_UUID,
            DEVICE_INFO_SERVICE_UUID,
        ],
        0..=3,
    );
    (any::<[u8; 6]>(), names, services).prop_map(|(address, local_name, services)| {
        Advertisement {
            address: PeerAddress::new(address),
            local_name,
            services,
            appearance: None,
            rssi: Some(-70),
        }
    })
}

fn scan(advertisements: Vec<Advertisement>) -> Option<PeerDescriptor> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime builds");
    runtime.block_on(async {
        let air = SimulatedAir::ideal();
        for advertisement in advertisements {
            air.add_beacon(advertisement);
        }
        DiscoveryEngine::new(CentralConfig::default().scan_params())
            .find_peer(&air.central(CENTRAL_ADDRESS), "sensor", ADVERTISED_SERVICE_UUID)
            .await
            .expect("scan starts")
    })
}

proptest! {
    /// Property: a peer is returned iff some advertisement matches name AND service
    #[test]
    fn finds_peer_iff_one_matches(
        noise in prop::collection::vec(arb_advertisement(), 0..6),
        include_target in any::<bool>(),
    ) {
        let expected = include_target
            || noise.iter().any(|adv| adv.matches("sensor", &ADVERTISED_SERVICE_UUID));
        let mut advertisements = noise;
        if include_target {
            advertisements.push(target());
        }

        let found = scan(advertisements);

        prop_assert_eq!(found.is_some(), expected);
        if let Some(peer) = found {
            prop_assert_eq!(peer.name, "sensor");
            prop_assert!(peer.services.contains(&ADVERTISED_SERVICE_UUID));
        }
    }

    /// Property: the order of non-matching advertisements does not matter
    #[test]
    fn order_of_noise_is_irrelevant(
        noise in prop::collection::vec(arb_advertisement(), 0..6),
        position in 0usize..6,
    ) {
        let noise: Vec<_> = noise
            .into_iter()
            .filter(|adv| !adv.matches("sensor", &ADVERTISED_SERVICE_UUID))
            .collect();

        let mut forward = noise.clone();
        forward.insert(position.min(forward.len()), target());
        let mut reversed: Vec<_> = noise.into_iter().rev().collect();
        reversed.insert(position.min(reversed.len()), target());

        let a = scan(forward).map(|peer| peer.address);
        let b = scan(reversed).map(|peer| peer.address);
        prop_assert_eq!(a, Some(TARGET_ADDRESS));
        prop_assert_eq!(b, Some(TARGET_ADDRESS));
    }
}

#[tokio::test(start_paused = true)]
async fn returns_on_first_match() {
    let air = SimulatedAir::ideal();
    air.add_beacon(target());
    let engine = DiscoveryEngine::new(CentralConfig::default().scan_params());

    let started = Instant::now();
    let peer = engine
        .find_peer(&air.central(CENTRAL_ADDRESS), "sensor", ADVERTISED_SERVICE_UUID)
        .await
        .expect("scan starts");

    assert_eq!(peer.map(|p| p.address), Some(TARGET_ADDRESS));
    assert_eq!(started.elapsed(), Duration::from_millis(30));
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_scan_duration() {
    let air = SimulatedAir::ideal();
    let mut wrong_service = target();
    wrong_service.services = vec![SENSOR_SERVICE_UUID];
    air.add_beacon(wrong_service);
    let engine = DiscoveryEngine::new(
        CentralConfig::default()
            .with_scan_timeout(Duration::from_millis(800))
            .scan_params(),
    );

    let started = Instant::now();
    let peer = engine
        .find_peer(&air.central(CENTRAL_ADDRESS), "sensor", ADVERTISED_SERVICE_UUID)
        .await
        .expect("scan starts");

    assert_eq!(peer, None);
    assert_eq!(started.elapsed(), Duration::from_millis(800));
    assert_eq!(air.counters().scans, 1);
}
