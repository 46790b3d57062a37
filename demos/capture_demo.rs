//! Demonstration of a FlowState capture session.
//!
//! This example shows how to:
//! 1. Create a capture controller around an input hook
//! 2. Drive keyboard and mouse callbacks through it
//! 3. Stop the session and inspect its counters
//! 4. Audit the resulting session log
//!
//! Run with: cargo run --example capture_demo
//!
//! No device access is needed: input is synthesized through a `ManualHook`.

use std::thread;
use std::time::Duration;

use flowstate_sensor::{
    analysis::{analyze_log, render_report},
    collector::{CaptureConfig, CaptureController, Key, ManualHook, MouseButton},
    CAPTURE_NOTICE,
};

fn main() {
    println!("FlowState Sensor - Capture Demo");
    println!("===============================");
    println!("{CAPTURE_NOTICE}");

    let base_dir = std::env::temp_dir().join("flowstate-demo");
    let config = CaptureConfig {
        base_dir,
        ..CaptureConfig::default()
    };

    let hook = ManualHook::new();
    let input = hook.injector();
    let mut controller = CaptureController::new(config, hook);

    if let Err(e) = controller.start() {
        eprintln!("Error starting capture: {e}");
        return;
    }
    if let Some(path) = controller.session_path() {
        println!("Recording to {}", path.display());
    }

    // Type a word with human-ish gaps.
    for c in "hello".chars() {
        input.key_press(Key::Char(c));
        thread::sleep(Duration::from_millis(60));
        input.key_release(Key::Char(c));
        thread::sleep(Duration::from_millis(90));
    }

    // Sweep the pointer, with some jitter that gets throttled.
    for step in 0..20 {
        input.mouse_move(step * 15, step * 8);
        input.mouse_move(step * 15 + 1, step * 8);
        thread::sleep(Duration::from_millis(30));
    }
    input.click(300, 160, MouseButton::Left, true);
    thread::sleep(Duration::from_millis(80));
    input.click(300, 160, MouseButton::Left, false);
    input.scroll(300, 160, 0, -2);

    controller.stop();

    println!();
    println!("{}", controller.summary());
    println!();

    let Some(path) = controller.session_path().cloned() else {
        return;
    };
    match analyze_log(&path) {
        Ok(stats) => print!("{}", render_report(&stats)),
        Err(e) => eprintln!("Error analyzing session: {e}"),
    }
}
