use std::{fs, thread::sleep, time::Duration};

use serial_test::serial;
use tempfile::tempdir;

// The global subscriber can only be installed once per test binary, so the
// file case and the repeated-init case share one test.
#[test]
#[serial]
fn writes_log_file_and_tolerates_reinit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("logs").join("marquee.log");

    let guard = flow_marquee::logging::init(true, Some(&path)).unwrap();
    assert!(guard.is_some());
    tracing::info!("marquee test line");
    drop(guard);

    sleep(Duration::from_millis(100));
    assert!(path.exists(), "log file was not created");
    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("marquee test line"));

    let again = flow_marquee::logging::init(false, None).unwrap();
    assert!(again.is_none());
}
