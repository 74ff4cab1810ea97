use flow_marquee::error::MarqueeError;
use flow_marquee::settings::Settings;
use tempfile::tempdir;

#[test]
fn missing_or_empty_file_means_defaults() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    assert_eq!(Settings::load(&missing).unwrap(), Settings::default());

    let empty = dir.path().join("empty.json");
    std::fs::write(&empty, "  \n").unwrap();
    let s = Settings::load(&empty).unwrap();
    assert_eq!(s.server_url, "http://127.0.0.1:8188");
    assert_eq!(s.request_timeout_secs, 30);
    assert_eq!(s.initial_box_side, 512.0);
    assert!(s.force_multiple_of_8);
    assert!(s.log_file.is_none());
}

#[test]
fn partial_file_keeps_defaults_for_the_rest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"server_url":"https://comfy.local:8443","debug_logging":true,"max_display_width":800}"#,
    )
    .unwrap();

    let s = Settings::load(&path).unwrap();
    assert_eq!(s.server_url, "https://comfy.local:8443");
    assert!(s.debug_logging);
    assert_eq!(s.max_display_width, 800.0);
    assert_eq!(s.max_display_height, 900.0);
    assert_eq!(s.viewport_fraction, 0.85);
    assert!(s.validate().is_ok());

    let layout = s.layout();
    assert_eq!(layout.max_display_width, 800.0);
    assert_eq!(layout.initial_side, 512.0);
}

#[test]
fn save_then_load_preserves_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let mut s = Settings::default();
    s.initial_box_side = 256.0;
    s.log_file = Some(dir.path().join("marquee.log"));
    s.save(&path).unwrap();
    assert_eq!(Settings::load(&path).unwrap(), s);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(Settings::load(&path).is_err());
}

#[test]
fn validate_rejects_bad_values() {
    let bad_url = Settings {
        server_url: "ftp://example.com".into(),
        ..Settings::default()
    };
    assert!(matches!(bad_url.validate(), Err(MarqueeError::Config(_))));

    let zero_side = Settings {
        initial_box_side: 0.0,
        ..Settings::default()
    };
    assert!(matches!(zero_side.validate(), Err(MarqueeError::Config(_))));

    let bad_fraction = Settings {
        viewport_fraction: 1.5,
        ..Settings::default()
    };
    assert!(matches!(bad_fraction.validate(), Err(MarqueeError::Config(_))));

    let no_timeout = Settings {
        request_timeout_secs: 0,
        ..Settings::default()
    };
    assert!(matches!(no_timeout.validate(), Err(MarqueeError::Config(_))));
}
