//! Window ROI Capture host
//!
//! Polls a window on a fixed interval, crops it to its selected region and
//! writes the latest frame to `<exe_dir>/frames/`.
//!
//! Usage: `window-roi-capture [window title]`. Other settings come from
//! config.json next to the executable.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use window_roi_capture::config::{self, CaptureConfig};
use window_roi_capture::selector::{InteractiveSelector, NoSelector};
use window_roi_capture::{
    log, paths, CaptureRequest, OutputFrame, RegionCache, RegionSelector, WindowCaptureSource,
};

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        log(&format!("[PANIC]{} {}", location, msg));
    }));

    // Ensure output directories exist
    paths::ensure_directories()?;

    config::init_config(std::env::args().nth(1));
    let config = config::get_config();

    log(&format!("Window ROI Capture started, target: \"{}\"", config.window_title));
    run_capture_loop(config)
}

/// Polls the configured window until `max_polls` is reached (or forever).
fn run_capture_loop(config: &CaptureConfig) -> Result<()> {
    let selector: Box<dyn RegionSelector> = if config.interactive_selection {
        Box::new(InteractiveSelector)
    } else {
        log("Interactive selection disabled, regions default to the full window");
        Box::new(NoSelector)
    };
    let source = WindowCaptureSource::desktop(selector, Arc::new(RegionCache::new()));

    let interval = Duration::from_millis(config.poll_interval_ms);
    let mut poll_token: u64 = 0;
    loop {
        let request = CaptureRequest {
            window_title: config.window_title.clone(),
            reset_roi: poll_token == 0 && config.reset_roi_on_start,
            poll_token,
        };

        let frame = source.poll(&request);
        if config.save_frames {
            if let Err(e) = save_frame(&frame, &config.output_file) {
                log(&format!("Failed to save frame: {}", e));
            }
        }

        poll_token += 1;
        if config.max_polls != 0 && poll_token >= config.max_polls {
            log(&format!("Finished after {} polls", poll_token));
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}

fn save_frame(frame: &OutputFrame, file_name: &str) -> Result<()> {
    let path = paths::get_frames_dir().join(file_name);
    frame.to_rgb_image().save(&path)?;
    let [_, height, width, _] = frame.shape();
    log(&format!("Saved {}x{} frame to {}", width, height, path.display()));
    Ok(())
}
