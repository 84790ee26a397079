use anyhow::bail;

use super::{Color, Image};

/// Canvas intensity above which a canvas pixel counts as painted.
pub const DEFAULT_CUTOFF: u8 = 50;

/// Composites a canvas of strokes over a live frame.
///
/// Every canvas pixel whose [intensity][Color::intensity] exceeds `cutoff` replaces the frame
/// pixel below it; every other frame pixel is OR-ed with the (dark) canvas pixel, which leaves it
/// unchanged as long as the canvas only contains black and painted pixels.
///
/// Returns an error if `frame` and `canvas` differ in size.
pub fn composite(frame: &Image, canvas: &Image, cutoff: u8) -> anyhow::Result<Image> {
    let mut display = frame.clone();
    composite_in_place(&mut display, canvas, cutoff)?;
    Ok(display)
}

/// In-place version of [`composite`], overwriting `frame` with the result.
///
/// `frame` is left untouched if an error is returned.
pub fn composite_in_place(frame: &mut Image, canvas: &Image, cutoff: u8) -> anyhow::Result<()> {
    if frame.resolution() != canvas.resolution() {
        bail!(
            "cannot composite a {} canvas onto a {} frame",
            canvas.resolution(),
            frame.resolution(),
        );
    }

    for (dest, src) in frame.buf.pixels_mut().zip(canvas.buf.pixels()) {
        let mask = keep_mask(Color(src.0), cutoff);
        for (d, s) in dest.0.iter_mut().zip(src.0) {
            *d = (*d & mask) | s;
        }
    }

    Ok(())
}

/// Inverted binary threshold: `0x00` for painted pixels, `0xff` for untouched ones.
#[inline]
fn keep_mask(canvas: Color, cutoff: u8) -> u8 {
    if canvas.intensity() > cutoff {
        0x00
    } else {
        0xff
    }
}
