//! Stroke engine owning the persistent canvas.

use crate::{
    gesture::DrawMode,
    hand::Keypoint,
    image::{draw, Color, Image, Resolution},
};

/// Color and width of the lines laid down on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brush {
    pub color: Color,
    pub thickness: u32,
}

impl Brush {
    pub const fn new(color: Color, thickness: u32) -> Self {
        Self { color, thickness }
    }

    /// An eraser paints the canvas background color.
    pub const fn eraser(thickness: u32) -> Self {
        Self::new(Color::BLACK, thickness)
    }
}

/// Where the current stroke left off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorState {
    /// No stroke in progress; the next point starts a new stroke.
    #[default]
    Inactive,
    /// A stroke is in progress and was last extended to `(x, y)`.
    Active { x: i32, y: i32 },
}

impl CursorState {
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    #[inline]
    pub fn position(&self) -> Option<(i32, i32)> {
        match *self {
            Self::Active { x, y } => Some((x, y)),
            Self::Inactive => None,
        }
    }
}

/// Turns a sequence of modes and cursor positions into strokes on a canvas.
///
/// The canvas starts out black (untouched) and lives as long as the engine. It is only ever
/// written with the brush color or black.
pub struct StrokeEngine {
    canvas: Image,
    brush: Brush,
    eraser: Brush,
}

impl StrokeEngine {
    pub fn new(resolution: Resolution, brush: Brush, eraser: Brush) -> Self {
        Self {
            canvas: Image::with_resolution(resolution),
            brush,
            eraser,
        }
    }

    /// Returns the canvas with all strokes drawn so far.
    #[inline]
    pub fn canvas(&self) -> &Image {
        &self.canvas
    }

    /// Advances the stroke state machine by one frame.
    ///
    /// - [`DrawMode::Idle`] ends the current stroke without touching the canvas.
    /// - [`DrawMode::Draw`] and [`DrawMode::Erase`] connect the previous cursor position to
    ///   `cursor` with the brush or eraser. If no stroke is in progress, a new one is started at
    ///   `cursor` and nothing is painted yet.
    ///
    /// While drawing, a pointer disc is painted onto `display` (the frame about to be shown), not
    /// onto the canvas.
    ///
    /// Returns the cursor state for the next frame.
    pub fn advance(
        &mut self,
        mode: DrawMode,
        cursor: Option<Keypoint>,
        state: CursorState,
        display: &mut Image,
    ) -> CursorState {
        let brush = match mode {
            DrawMode::Draw => self.brush,
            DrawMode::Erase => self.eraser,
            DrawMode::Idle => return self.lift(state),
        };
        let Some(cursor) = cursor else {
            return self.lift(state);
        };
        let (x, y) = (cursor.x(), cursor.y());

        match state {
            CursorState::Active { x: px, y: py } => {
                draw::line(&mut self.canvas, px, py, x, y)
                    .color(brush.color)
                    .stroke_width(brush.thickness)
                    .round_caps();
            }
            CursorState::Inactive => log::trace!("{mode} stroke starts at ({x}, {y})"),
        }

        if mode == DrawMode::Draw {
            let radius = brush.thickness / 2;
            draw::circle(display, x, y, radius * 2 + 1)
                .color(brush.color)
                .filled();
        }

        CursorState::Active { x, y }
    }

    fn lift(&self, state: CursorState) -> CursorState {
        if let Some((x, y)) = state.position() {
            log::trace!("stroke ends at ({x}, {y})");
        }
        CursorState::Inactive
    }
}
