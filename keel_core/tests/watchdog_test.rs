// Restart counting across simulated resets
use keel_core::watchdog::{
    FixedResetCause, RetainedMemory, RetainedStore, SentinelResetCause, SoftwareWatchdog,
    WatchdogState, WatchdogTracker, DEFAULT_MAX_PERIOD, RUNNING_SENTINEL,
};
use std::sync::Arc;
use std::time::Duration;

/// One boot of the device against a retained store that survives it
fn boot(retained: &RetainedMemory, crashed: bool) -> WatchdogTracker {
    WatchdogTracker::new(
        Box::new(SoftwareWatchdog::new()),
        Arc::new(retained.clone()),
        &FixedResetCause(crashed),
        DEFAULT_MAX_PERIOD,
    )
}

/// Boot whose reset cause is derived from the running-state sentinel
fn boot_with_sentinel(retained: &RetainedMemory, hardware: SoftwareWatchdog) -> WatchdogTracker {
    let store: Arc<dyn RetainedStore> = Arc::new(retained.clone());
    let cause = SentinelResetCause::new(store.clone());
    WatchdogTracker::new(Box::new(hardware), store, &cause, DEFAULT_MAX_PERIOD)
}

#[test]
fn test_consecutive_crashes_are_counted() {
    let retained = RetainedMemory::new();

    for expected in 1..=3 {
        let tracker = boot(&retained, true);
        assert!(tracker.last_reset_was_crash());
        assert_eq!(tracker.restart_count(), expected);
    }

    let tracker = boot(&retained, false);
    assert!(!tracker.last_reset_was_crash());
    assert_eq!(tracker.restart_count(), 0);
}

#[test]
fn test_restart_count_saturates() {
    let retained = RetainedMemory::new();
    retained.set_restart_count(255);

    let tracker = boot(&retained, true);
    assert_eq!(tracker.restart_count(), 255);
}

#[test]
fn test_power_cycle_clears_counter() {
    let retained = RetainedMemory::new();
    boot(&retained, true);
    boot(&retained, true);

    retained.power_cycle();
    assert_eq!(retained.restart_count(), 0);
    assert_eq!(boot(&retained, false).restart_count(), 0);
}

#[test]
fn test_boot_clears_running_state() {
    let retained = RetainedMemory::new();
    retained.set_running_state(RUNNING_SENTINEL);

    let tracker = boot(&retained, false);
    assert_eq!(retained.running_state(), 0);
    assert_eq!(tracker.state(), WatchdogState::Inactive);
}

#[test]
fn test_pulse_only_feeds_when_active() {
    let retained = RetainedMemory::new();
    let hardware = SoftwareWatchdog::new();
    let mut tracker = boot_with_sentinel(&retained, hardware.clone());

    tracker.pulse();
    assert_eq!(hardware.feed_count(), 0);
    assert!(!hardware.is_armed());

    tracker.activate().unwrap();
    tracker.pulse();
    tracker.pulse();

    if cfg!(feature = "debugger") {
        assert!(!tracker.is_active());
        assert_eq!(hardware.feed_count(), 0);
    } else {
        assert!(tracker.is_active());
        assert!(hardware.is_armed());
        assert_eq!(hardware.feed_count(), 2);
    }

    tracker.deactivate().unwrap();
    assert!(!hardware.is_armed());
    assert_eq!(retained.running_state(), 0);
}

#[cfg(not(feature = "debugger"))]
#[test]
fn test_sentinel_detects_unclean_reset() {
    let retained = RetainedMemory::new();

    // first boot: armed, then the device hangs and the watchdog fires
    let mut tracker = boot_with_sentinel(&retained, SoftwareWatchdog::new());
    assert!(!tracker.last_reset_was_crash());
    tracker.activate().unwrap();
    assert_eq!(retained.running_state(), RUNNING_SENTINEL);
    drop(tracker);

    let mut tracker = boot_with_sentinel(&retained, SoftwareWatchdog::new());
    assert!(tracker.last_reset_was_crash());
    assert_eq!(tracker.restart_count(), 1);

    // planned restart is not counted
    tracker.activate().unwrap();
    tracker.safe_restart();
    drop(tracker);

    let tracker = boot_with_sentinel(&retained, SoftwareWatchdog::new());
    assert!(!tracker.last_reset_was_crash());
    assert_eq!(tracker.restart_count(), 0);
}

#[cfg(not(feature = "debugger"))]
#[test]
fn test_missed_pulse_expires() {
    let retained = RetainedMemory::new();
    let hardware = SoftwareWatchdog::new();
    let mut tracker = WatchdogTracker::new(
        Box::new(hardware.clone()),
        Arc::new(retained),
        &FixedResetCause(false),
        Duration::from_millis(50),
    );

    tracker.activate().unwrap();
    tracker.pulse();
    assert!(!hardware.is_expired());

    std::thread::sleep(Duration::from_millis(120));
    assert!(hardware.is_expired());

    tracker.pulse();
    assert!(!hardware.is_expired());
}
