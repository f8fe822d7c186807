//! Hardware and session integration tests.
//!
//! These need a real input device and/or a running X11 session, so they are
//! ignored by default. Run manually with:
//! `cargo test --test device_integration -- --ignored --nocapture`

use std::time::Duration;

use touchmap::layout::read_layout;
use touchmap::pump::TouchPump;

#[test]
#[ignore] // Requires readable /dev/input devices
fn auto_detect_and_read() {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();

    let pump = TouchPump::new();
    pump.start_auto().expect(
        "no usable input device; check permissions (touchmap --udev-install)",
    );
    println!("selected: {:?}", pump.selected_device());

    pump.set_minmax_calibration(0.0, 4095.0, 0.0, 4095.0, 1920, 1080);
    println!("touch the device within 10 seconds...");
    if let Some(event) = pump.wait_for_event(Some(Duration::from_secs(10))) {
        println!("event: {:?} at ({}, {})", event.kind, event.x, event.y);
        assert!(event.x >= 0 && event.x < 1920);
        assert!(event.y >= 0 && event.y < 1080);
    }
    pump.stop();
    assert!(!pump.is_running());
}

#[test]
#[ignore] // Requires an X11 session
fn layout_query_reports_monitors() {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();

    let layout = read_layout().expect("no X11 display; run inside an X session");
    assert!(!layout.monitors.is_empty());
    assert!(layout.width > 0 && layout.height > 0);
    assert!(!layout.hash.is_empty());

    for monitor in &layout.monitors {
        println!(
            "[{}] {} {}x{}+{}+{} rot={}",
            monitor.index,
            monitor.name,
            monitor.width,
            monitor.height,
            monitor.x,
            monitor.y,
            monitor.rotation.as_str()
        );
        assert!(monitor.width > 0 && monitor.height > 0);
    }
}

#[test]
#[ignore] // Requires write access to /dev/uinput
fn mitm_device_lifecycle() {
    let pump = TouchPump::new();
    // The republisher can be created before a source device is started.
    pump.enable_mitm(true, false)
        .expect("uinput unavailable; modprobe uinput and check permissions");
    pump.enable_mitm(false, false).unwrap();
    pump.stop();
}
