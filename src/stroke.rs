// stroke.rs — freehand stroke capture onto a `Bitmap`.
//
// A gesture is Down → Move* → Up. Instead of attaching and detaching
// move/up listeners, the capture is an explicit two-state machine:
//
//   Idle ──Down──▶ Drawing ──Up──▶ Idle   (emits GestureEnd)
//                   │  ▲
//                   └──┘ Move (draws a segment)
//
// Move and Up while Idle are ignored. A Down while already Drawing starts a
// fresh stroke at the new point without emitting GestureEnd for the old one.
//
// The host runs one scan per `GestureEnd`.

use tracing::debug;

use crate::bitmap::{Bitmap, Rgba};

/// A pointer event in bitmap pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
}

/// Capture state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StrokeState {
    #[default]
    Idle,
    Drawing { last: (f32, f32) },
}

/// Emitted when a gesture completes; the cue to run a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureEnd {
    /// Segments drawn during the gesture (Moves while Drawing).
    pub segments: usize,
}

/// Pen used to stamp strokes.
///
/// A pen of width `w` covers every pixel within Chebyshev distance `w / 2`
/// of the pen centre, so a width-2 pen is a 3×3 stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pen {
    pub width: u32,
    pub color: Rgba,
}

impl Default for Pen {
    fn default() -> Self {
        Pen { width: 2, color: [0, 0, 0, 255] }
    }
}

impl Pen {
    /// Stamp the pen centred on `(cx, cy)`. Non-finite centres draw nothing.
    pub fn stamp(&self, bitmap: &mut Bitmap, cx: f32, cy: f32) {
        if !(cx.is_finite() && cy.is_finite()) {
            return;
        }
        let r = (self.width / 2) as i64;
        let (cx, cy) = (cx.round() as i64, cy.round() as i64);
        for y in cy - r..=cy + r {
            for x in cx - r..=cx + r {
                bitmap.set_clipped(x, y, self.color);
            }
        }
    }

    /// Stamp along the segment `from → to` at unit steps along its longer
    /// axis (DDA), both ends included. A segment with a non-finite end
    /// draws nothing.
    pub fn segment(&self, bitmap: &mut Bitmap, from: (f32, f32), to: (f32, f32)) {
        if ![from.0, from.1, to.0, to.1].iter().all(|v| v.is_finite()) {
            debug!(?from, ?to, "skipping segment with non-finite end");
            return;
        }
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.stamp(bitmap, from.0 + dx * t, from.1 + dy * t);
        }
    }
}

/// Freehand stroke capture.
#[derive(Debug, Clone, Default)]
pub struct StrokeCapture {
    pub pen: Pen,
    state: StrokeState,
    segments: usize,
}

impl StrokeCapture {
    pub fn new(pen: Pen) -> Self {
        StrokeCapture { pen, state: StrokeState::Idle, segments: 0 }
    }

    pub fn state(&self) -> StrokeState {
        self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, StrokeState::Drawing { .. })
    }

    /// Feed one pointer event. Returns `Some(GestureEnd)` on the Up that
    /// completes a gesture.
    pub fn handle(&mut self, bitmap: &mut Bitmap, event: PointerEvent) -> Option<GestureEnd> {
        match (self.state, event) {
            (_, PointerEvent::Down { x, y }) => {
                self.pen.stamp(bitmap, x, y);
                self.state = StrokeState::Drawing { last: (x, y) };
                self.segments = 0;
                None
            }
            (StrokeState::Drawing { last }, PointerEvent::Move { x, y }) => {
                self.pen.segment(bitmap, last, (x, y));
                self.state = StrokeState::Drawing { last: (x, y) };
                self.segments += 1;
                None
            }
            (StrokeState::Drawing { .. }, PointerEvent::Up) => {
                self.state = StrokeState::Idle;
                debug!(segments = self.segments, "stroke gesture complete");
                Some(GestureEnd { segments: std::mem::take(&mut self.segments) })
            }
            (StrokeState::Idle, PointerEvent::Move { .. } | PointerEvent::Up) => None,
        }
    }

    /// Draw a whole polyline as one gesture. Convenience for tests, demos
    /// and benches.
    pub fn draw_polyline(&mut self, bitmap: &mut Bitmap, points: &[(f32, f32)]) -> Option<GestureEnd> {
        let (&(x0, y0), rest) = points.split_first()?;
        self.handle(bitmap, PointerEvent::Down { x: x0, y: y0 });
        for &(x, y) in rest {
            self.handle(bitmap, PointerEvent::Move { x, y });
        }
        self.handle(bitmap, PointerEvent::Up)
    }
}
