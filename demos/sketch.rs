// demos/sketch.rs — draw with the mouse, see the boundary after every stroke.
//
// Each completed stroke (button down, drag, button up) triggers one GPU scan
// of the canvas. The result is painted over the drawing: red marks the
// topmost drawn row, blue the bottommost, either as full-width lines
// (global mode) or as ticks in every drawn column (per-column mode).
//
// USAGE
// ─────
//   cargo run --example sketch                      # blank 640×480 canvas
//   cargo run --example sketch -- path/to/img.png   # start from an image
//   RUST_LOG=skyline_scan=debug cargo run --example sketch
//
// KEYS
// ────
//   Tab     toggle global / per-column mode (rescans)
//   C       clear the canvas
//   S       save the composed view to sketch.png
//   Escape  quit

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};
use tracing_subscriber::EnvFilter;

use skyline_scan::bitmap::Bitmap;
use skyline_scan::extrema::{Extrema, ScanMode};
use skyline_scan::gpu::{GpuBoundaryScanner, GpuDevice, ScanConfig};
use skyline_scan::overlay::{self, OverlayStyle};
use skyline_scan::stroke::{PointerEvent, StrokeCapture};

const DEFAULT_SIZE: (usize, usize) = (640, 480);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Canvas ---
    let mut canvas = match std::env::args().nth(1) {
        Some(path) => load_canvas(&path),
        None => Bitmap::new(DEFAULT_SIZE.0, DEFAULT_SIZE.1),
    };
    let (w, h) = (canvas.width(), canvas.height());

    // --- GPU ---
    let gpu = GpuDevice::new().unwrap_or_else(|e| {
        eprintln!("sketch: {e}");
        std::process::exit(1);
    });
    eprintln!("[sketch] {}", gpu.adapter_info);
    let mut scanner = GpuBoundaryScanner::new(&gpu, w as u32, h as u32, ScanConfig::default())
        .unwrap_or_else(|e| {
            eprintln!("sketch: {e}");
            std::process::exit(1);
        });

    // --- Window ---
    let mut window = Window::new(
        "sketch — Tab: mode | C: clear | S: save | Esc: quit",
        w,
        h,
        WindowOptions { resize: false, ..Default::default() },
    )
    .expect("failed to open window");
    window.limit_update_rate(Some(std::time::Duration::from_millis(16)));

    let style = OverlayStyle::default();
    let mut capture = StrokeCapture::default();
    let mut mode = ScanMode::Global;
    let mut extrema: Option<Extrema> = None;
    let mut was_down = false;
    let mut fb = vec![0u32; w * h];

    while window.is_open() && !window.is_key_down(Key::Escape) {
        let mut rescan = false;

        // Pointer → stroke events. The collaborator runs the scan only when
        // a gesture completes.
        let down = window.get_mouse_down(MouseButton::Left);
        let pos = window.get_mouse_pos(MouseMode::Clamp);
        let event = match (was_down, down, pos) {
            (false, true, Some((x, y))) => Some(PointerEvent::Down { x, y }),
            (true, true, Some((x, y))) => Some(PointerEvent::Move { x, y }),
            (true, false, _) => Some(PointerEvent::Up),
            _ => None,
        };
        was_down = down;
        if let Some(event) = event {
            rescan |= capture.handle(&mut canvas, event).is_some();
        }

        if window.is_key_pressed(Key::Tab, KeyRepeat::No) {
            mode = match mode {
                ScanMode::Global => ScanMode::PerColumn,
                ScanMode::PerColumn => ScanMode::Global,
            };
            eprintln!("[sketch] mode: {mode}");
            rescan = true;
        }
        if window.is_key_pressed(Key::C, KeyRepeat::No) {
            canvas.clear();
            rescan = true;
        }

        if rescan {
            extrema = match scanner.scan(&gpu, &canvas, mode) {
                Ok(ext) => Some(ext),
                Err(e) => {
                    eprintln!("[sketch] scan failed: {e}");
                    None
                }
            };
        }

        let view = match &extrema {
            Some(ext) => overlay::compose(&canvas, ext, scanner.config().orientation, &style),
            None => canvas.clone(),
        };

        if window.is_key_pressed(Key::S, KeyRepeat::No) {
            match image::RgbaImage::from(&view).save("sketch.png") {
                Ok(()) => eprintln!("[sketch] saved sketch.png"),
                Err(e) => eprintln!("[sketch] save failed: {e}"),
            }
        }

        for (x, y, px) in view.pixels() {
            fb[y * w + x] = over_white(px);
        }
        window.update_with_buffer(&fb, w, h).expect("window update failed");
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Composite an RGBA pixel over white and pack it as 0RGB for minifb.
#[inline]
fn over_white(px: [u8; 4]) -> u32 {
    let a = px[3] as u32;
    let blend = |c: u8| (c as u32 * a + 255 * (255 - a)) / 255;
    0xFF00_0000 | (blend(px[0]) << 16) | (blend(px[1]) << 8) | blend(px[2])
}

/// Load any image format supported by the `image` crate as the starting canvas.
fn load_canvas(path: &str) -> Bitmap {
    let img = image::open(path)
        .unwrap_or_else(|e| panic!("failed to open {path}: {e}"))
        .to_rgba8();
    Bitmap::from(&img)
}
