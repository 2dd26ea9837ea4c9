//! Central session scenarios over the simulated air
//!
//! All tests run on tokio's paused clock, so timing is deterministic.

use std::sync::Arc;
use std::time::Duration;

use sensorlink_core::protocol::SENSOR_CHARACTERISTIC_UUID;
use sensorlink_core::{
    CentralConfig, CentralRole, CodecError, Endpoint, PeripheralConfig, PeripheralRole,
    ReadFailure, RetryPolicy, SensorValue, SessionOutcome, SessionPhase, SessionState,
    SimulatedSensor, TransportError,
};
use sensorlink_harness::{
    ReadFault, RecordingLed, SimCentral, SimulatedAir, CENTRAL_ADDRESS, PERIPHERAL_ADDRESS,
};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

struct RunningPeripheral {
    task: JoinHandle<()>,
    state: Arc<SessionState>,
}

impl Drop for RunningPeripheral {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn spawn_peripheral(air: &SimulatedAir) -> RunningPeripheral {
    let config = PeripheralConfig::default()
        .with_seed(7)
        .with_serial("00112233aabbccdd");
    let sensor = SimulatedSensor::with_seed(config.initial_value, config.max_step, 7);
    let mut role = PeripheralRole::new(
        air.peripheral(PERIPHERAL_ADDRESS),
        sensor,
        RecordingLed::new(),
        &config,
    )
    .expect("default peripheral config is valid");
    let state = role.state().clone();
    let task = tokio::spawn(async move {
        role.run().await.expect("service registration succeeds");
    });
    RunningPeripheral { task, state }
}

fn central(air: &SimulatedAir, config: CentralConfig) -> CentralRole<SimCentral, RecordingLed> {
    CentralRole::new(air.central(CENTRAL_ADDRESS), RecordingLed::new(), config)
}

/// Run a central to completion, failing the test if it never terminates
async fn run_to_end(
    mut role: CentralRole<SimCentral, RecordingLed>,
) -> (SessionOutcome, Arc<SessionState>, RecordingLed) {
    let state = role.state().clone();
    let led = role.indicator().led().clone();
    let task = tokio::spawn(async move { role.run().await });
    let outcome = timeout(Duration::from_secs(60), task)
        .await
        .expect("central role terminates")
        .expect("central task does not panic");
    (outcome, state, led)
}

async fn run_with_read_fault(fault: ReadFault) -> (SessionOutcome, Arc<SessionState>, SimulatedAir) {
    let air = SimulatedAir::default();
    let peripheral = spawn_peripheral(&air);
    air.schedule_read_fault(fault, 5);

    let (outcome, state, led) = run_to_end(central(&air, CentralConfig::default())).await;

    assert_eq!(led.last_level(), Some(false), "indicator switched off on exit");
    assert!(!air.is_linked(), "link closed after termination");
    sleep(Duration::from_millis(10)).await;
    assert!(!peripheral.state.is_connected(), "peripheral saw the disconnect");
    assert!(air.is_advertising(), "peripheral advertises again");
    (outcome, state, air)
}

// ----------------------------------------------------------------------------
// Happy Path
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn central_reads_value_written_by_producer() {
    let air = SimulatedAir::default();
    let peripheral = spawn_peripheral(&air);

    let mut role = central(&air, CentralConfig::default());
    let readings = role.session().readings();
    let phase = role.session().phase();
    let state = role.state().clone();
    let led = role.indicator().led().clone();
    let task = tokio::spawn(async move { role.run().await });

    sleep(Duration::from_millis(5500)).await;

    assert_eq!(*phase.borrow(), SessionPhase::Polling);
    assert!(state.is_connected());
    assert!(state.is_alive());
    assert!(peripheral.state.is_connected());

    let counters = air.counters();
    assert_eq!(counters.writes, 5);
    assert_eq!(counters.notifications, 5);

    let stored = air
        .value(SENSOR_CHARACTERISTIC_UUID)
        .expect("sensor characteristic registered");
    let written = SensorValue::decode(&stored).expect("producer writes two bytes");
    assert_eq!(*readings.borrow(), Some(written));
    assert_eq!(air.last_notification(), Some(stored));

    let intervals = led.intervals();
    assert_eq!(intervals.first(), Some(&Duration::from_millis(250)));
    assert_eq!(intervals.last(), Some(&Duration::from_millis(1000)));

    task.abort();
}

#[tokio::test(start_paused = true)]
async fn first_reads_see_initial_value() {
    let air = SimulatedAir::default();
    let _peripheral = spawn_peripheral(&air);

    let mut role = central(&air, CentralConfig::default());
    let readings = role.session().readings();
    let task = tokio::spawn(async move { role.run().await });

    sleep(Duration::from_millis(500)).await;

    assert_eq!(air.counters().writes, 0);
    assert_eq!(*readings.borrow(), Some(SensorValue::from_centi(2450)));
    task.abort();
}

// ----------------------------------------------------------------------------
// Read Failure Classes
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn malformed_read_terminates_session() {
    let (outcome, state, _air) = run_with_read_fault(ReadFault::Malformed).await;

    assert_eq!(
        outcome,
        SessionOutcome::LinkLost(ReadFailure::Malformed(CodecError::WrongLength {
            expected: 2,
            actual: 1
        }))
    );
    assert!(!state.is_connected());
    assert!(!state.is_alive());
}

#[tokio::test(start_paused = true)]
async fn read_timeout_terminates_session() {
    let (outcome, state, _air) = run_with_read_fault(ReadFault::Timeout).await;

    assert_eq!(
        outcome,
        SessionOutcome::LinkLost(ReadFailure::Timeout {
            after: Duration::from_millis(1000)
        })
    );
    assert!(!state.is_connected());
    assert!(!state.is_alive());
}

#[tokio::test(start_paused = true)]
async fn protocol_error_terminates_session() {
    let (outcome, state, air) = run_with_read_fault(ReadFault::Protocol).await;

    assert!(matches!(
        outcome,
        SessionOutcome::LinkLost(ReadFailure::Protocol(TransportError::Protocol(_)))
    ));
    assert!(!state.is_connected());
    assert!(!state.is_alive());
    assert_eq!(air.counters().reads, 6);
}

#[tokio::test(start_paused = true)]
async fn dropped_link_is_a_protocol_failure() {
    let air = SimulatedAir::default();
    let _peripheral = spawn_peripheral(&air);
    let role = central(&air, CentralConfig::default());

    let dropper = {
        let air = air.clone();
        async move {
            sleep(Duration::from_millis(1500)).await;
            assert!(air.drop_link());
        }
    };
    let ((outcome, state, _led), ()) = tokio::join!(run_to_end(role), dropper);

    assert_eq!(
        outcome,
        SessionOutcome::LinkLost(ReadFailure::Protocol(TransportError::NotConnected))
    );
    assert!(!state.is_connected());
    assert!(!state.is_alive());
}

// ----------------------------------------------------------------------------
// Pre-polling Failures
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn resolution_timeout_clears_both_flags() {
    let air = SimulatedAir::default();
    let _peripheral = spawn_peripheral(&air);
    air.stall_discovery(true);

    let started = Instant::now();
    let (outcome, state, _led) = run_to_end(central(&air, CentralConfig::default())).await;

    assert_eq!(
        outcome,
        SessionOutcome::EndpointTimeout {
            endpoint: Endpoint::Service
        }
    );
    assert!(started.elapsed() >= Duration::from_millis(2000));
    assert!(!state.is_connected());
    assert!(!state.is_alive());
    assert!(!air.is_linked());
}

#[tokio::test(start_paused = true)]
async fn characteristic_timeout_clears_both_flags() {
    let air = SimulatedAir::default();
    let _peripheral = spawn_peripheral(&air);
    air.stall_characteristic_discovery(true);

    let started = Instant::now();
    let (outcome, state, _led) = run_to_end(central(&air, CentralConfig::default())).await;

    assert_eq!(
        outcome,
        SessionOutcome::EndpointTimeout {
            endpoint: Endpoint::Characteristic
        }
    );
    assert!(started.elapsed() >= Duration::from_millis(2000));
    assert!(!state.is_connected());
    assert!(!state.is_alive());
    assert!(!air.is_linked());
    assert_eq!(air.counters().reads, 0);
}

#[tokio::test(start_paused = true)]
async fn connect_timeout_is_terminal() {
    let air = SimulatedAir::default();
    let _peripheral = spawn_peripheral(&air);
    air.stall_connect(true);

    let started = Instant::now();
    let (outcome, state, _led) = run_to_end(central(&air, CentralConfig::default())).await;

    assert_eq!(outcome, SessionOutcome::ConnectTimeout);
    assert!(started.elapsed() >= Duration::from_millis(10_000));
    assert!(!state.is_connected());
    assert!(!state.is_alive());
    assert_eq!(air.counters().connections, 0);
}

#[tokio::test(start_paused = true)]
async fn no_peer_ends_session_after_scan_timeout() {
    let air = SimulatedAir::default();

    let started = Instant::now();
    let (outcome, state, led) = run_to_end(central(&air, CentralConfig::default())).await;

    assert_eq!(outcome, SessionOutcome::PeerNotFound);
    // The indicator may finish one more idle blink after the scan gives up
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(5000) && elapsed <= Duration::from_millis(5250));
    assert_eq!(air.counters().scans, 1);
    assert!(!state.is_alive());
    assert!(led
        .intervals()
        .iter()
        .all(|gap| *gap == Duration::from_millis(250)));
}

#[tokio::test(start_paused = true)]
async fn unknown_service_is_reported_as_unavailable() {
    let air = SimulatedAir::default();
    let peripheral = air.peripheral(PERIPHERAL_ADDRESS);
    let advertiser = sensorlink_core::AdvertisingManager::new(
        PeripheralConfig::default().advertising_params(),
        Duration::from_secs(1),
        SessionState::shared(),
    );
    // No services registered
    let task = tokio::spawn(async move { advertiser.run(&peripheral).await });

    let (outcome, state, _led) = run_to_end(central(&air, CentralConfig::default())).await;

    assert!(matches!(
        outcome,
        SessionOutcome::EndpointUnavailable {
            endpoint: Endpoint::Service,
            error: TransportError::NotFound { .. }
        }
    ));
    assert!(!state.is_connected());
    assert!(!state.is_alive());
    task.abort();
}

// ----------------------------------------------------------------------------
// Retry and Cancellation
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn retry_policy_bounds_rescans() {
    let air = SimulatedAir::default();
    let config =
        CentralConfig::default().with_retry(RetryPolicy::attempts(2, Duration::from_millis(500)));

    let started = Instant::now();
    let (outcome, state, _led) = run_to_end(central(&air, config)).await;

    assert_eq!(outcome, SessionOutcome::PeerNotFound);
    assert_eq!(air.counters().scans, 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(3 * 5000 + 2 * 500));
    assert!(elapsed <= Duration::from_millis(3 * 5000 + 2 * 500 + 250));
    assert!(!state.is_alive());
}

#[tokio::test(start_paused = true)]
async fn retry_reaches_late_peripheral() {
    let air = SimulatedAir::default();
    let config =
        CentralConfig::default().with_retry(RetryPolicy::attempts(1, Duration::from_millis(100)));
    let mut role = central(&air, config);
    let state = role.state().clone();
    let task = tokio::spawn(async move { role.run().await });

    sleep(Duration::from_millis(5050)).await;
    let _peripheral = spawn_peripheral(&air);
    sleep(Duration::from_millis(1000)).await;

    assert_eq!(air.counters().scans, 2);
    assert!(state.is_connected());
    assert!(state.is_alive());
    task.abort();
}

#[tokio::test(start_paused = true)]
async fn terminating_alive_cancels_polling() {
    let air = SimulatedAir::default();
    let _peripheral = spawn_peripheral(&air);
    let role = central(&air, CentralConfig::default());
    let shared = role.state().clone();

    let canceller = async {
        sleep(Duration::from_millis(2000)).await;
        assert!(shared.is_connected());
        shared.terminate();
    };
    let ((outcome, state, led), ()) = tokio::join!(run_to_end(role), canceller);

    assert_eq!(outcome, SessionOutcome::Cancelled);
    assert!(!state.is_connected());
    assert_eq!(led.last_level(), Some(false));
    assert!(!air.is_linked());
}
