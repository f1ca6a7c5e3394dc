// tests/test_stroke_overlay.rs — The collaborators around the scan: stroke
// capture feeding a bitmap, and the overlay painting decoded extrema.
//
// These run with `cargo test --test test_stroke_overlay`.

use skyline_scan::bitmap::Bitmap;
use skyline_scan::extrema::{Extrema, LineExtent, Orientation, ScanMode};
use skyline_scan::overlay::{self, OverlayStyle};
use skyline_scan::reference;
use skyline_scan::stroke::{GestureEnd, Pen, PointerEvent, StrokeCapture, StrokeState};

// ===== Gesture state machine =====

#[test]
fn gesture_ends_once_per_down_up_pair() {
    let mut bmp = Bitmap::new(20, 20);
    let mut capture = StrokeCapture::default();

    assert_eq!(capture.handle(&mut bmp, PointerEvent::Move { x: 1.0, y: 1.0 }), None);
    assert_eq!(capture.handle(&mut bmp, PointerEvent::Up), None);
    assert!(bmp.pixels().all(|(_, _, p)| p[3] == 0), "idle events must not draw");

    assert_eq!(capture.handle(&mut bmp, PointerEvent::Down { x: 5.0, y: 5.0 }), None);
    assert!(capture.is_drawing());
    capture.handle(&mut bmp, PointerEvent::Move { x: 10.0, y: 5.0 });
    capture.handle(&mut bmp, PointerEvent::Move { x: 10.0, y: 12.0 });
    let end = capture.handle(&mut bmp, PointerEvent::Up);
    assert_eq!(end, Some(GestureEnd { segments: 2 }));
    assert_eq!(capture.state(), StrokeState::Idle);

    // A second Up is ignored.
    assert_eq!(capture.handle(&mut bmp, PointerEvent::Up), None);
}

#[test]
fn stroke_off_canvas_is_clipped() {
    let mut bmp = Bitmap::new(10, 10);
    let mut capture = StrokeCapture::new(Pen { width: 2, color: [0, 0, 0, 255] });
    capture.draw_polyline(&mut bmp, &[(-5.0, 5.0), (15.0, 5.0)]);
    for x in 0..10 {
        assert!(bmp.is_drawn(x, 5), "column {x} must be stroked");
    }
    assert!(!bmp.is_drawn(0, 7));
}

// ===== Capture → scan → overlay =====

#[test]
fn each_completed_gesture_rescans_from_scratch() {
    let mut bmp = Bitmap::new(40, 40);
    let mut capture = StrokeCapture::default();

    capture.draw_polyline(&mut bmp, &[(10.0, 20.0), (30.0, 20.0)]);
    let first = reference::scan(&bmp, ScanMode::Global, Orientation::TopDown).expect("scan");
    assert_eq!(first.as_global(), Some(LineExtent::found(19, 21)));

    capture.draw_polyline(&mut bmp, &[(20.0, 2.0), (20.0, 35.0)]);
    let second = reference::scan(&bmp, ScanMode::Global, Orientation::TopDown).expect("scan");
    assert_eq!(second.as_global(), Some(LineExtent::found(1, 36)));

    bmp.clear();
    let cleared = reference::scan(&bmp, ScanMode::Global, Orientation::TopDown).expect("scan");
    assert_eq!(cleared, Extrema::Global(LineExtent::NOT_FOUND));
}

#[test]
fn overlay_marks_stroke_extent() {
    let mut bmp = Bitmap::new(60, 60);
    StrokeCapture::default().draw_polyline(&mut bmp, &[(30.0, 15.0), (30.0, 45.0)]);
    let extrema = reference::scan(&bmp, ScanMode::Global, Orientation::TopDown).expect("scan");
    let style = OverlayStyle::default();
    let out = overlay::compose(&bmp, &extrema, Orientation::TopDown, &style);

    let (top, bottom) = extrema.as_global().and_then(|e| e.rows()).expect("found");
    assert_eq!((top, bottom), (14, 46));
    assert_eq!(out.get(0, top as usize), style.top_color);
    assert_eq!(out.get(59, bottom as usize), style.bottom_color);
    // Away from the markers the stroke shows through.
    assert_eq!(out.get(30, 30), [0, 0, 0, 255]);
    // The source is not modified.
    assert_eq!(bmp.get(0, top as usize)[3], 0);
}

#[test]
fn per_column_overlay_only_touches_stroked_columns() {
    let mut bmp = Bitmap::new(30, 30);
    StrokeCapture::default().draw_polyline(&mut bmp, &[(15.0, 5.0), (15.0, 25.0)]);
    let extrema = reference::scan(&bmp, ScanMode::PerColumn, Orientation::TopDown).expect("scan");
    let out = overlay::compose(&bmp, &extrema, Orientation::TopDown, &OverlayStyle::default());

    for x in (0..30).filter(|x| !(14..=16).contains(x)) {
        for y in 0..30 {
            assert_eq!(out.get(x, y), bmp.get(x, y), "({x}, {y}) changed");
        }
    }
    assert_ne!(out, bmp);
}

#[test]
fn bottom_up_results_land_on_the_same_pixels() {
    let mut bmp = Bitmap::new(50, 40);
    StrokeCapture::default().draw_polyline(&mut bmp, &[(5.0, 8.0), (45.0, 30.0)]);
    let style = OverlayStyle::default();

    for mode in [ScanMode::Global, ScanMode::PerColumn] {
        let top_down = reference::scan(&bmp, mode, Orientation::TopDown).expect("scan");
        let bottom_up = reference::scan(&bmp, mode, Orientation::BottomUp).expect("scan");
        assert_ne!(top_down, bottom_up, "{mode}: orientations must report different rows");
        assert_eq!(
            overlay::compose(&bmp, &bottom_up, Orientation::BottomUp, &style),
            overlay::compose(&bmp, &top_down, Orientation::TopDown, &style),
            "{mode}"
        );
    }
}

#[test]
fn image_round_trip_preserves_alpha() {
    let mut bmp = Bitmap::new(5, 3);
    bmp.set(4, 2, [10, 20, 30, 40]);
    let img = image::RgbaImage::from(&bmp);
    assert_eq!(img.get_pixel(4, 2).0, [10, 20, 30, 40]);
    assert_eq!(Bitmap::from(&img), bmp);
}
