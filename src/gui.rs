//! A minimal software-rendered window for displaying composited frames.

use anyhow::anyhow;
use minifb::{Key, WindowOptions};

use crate::{
    image::{Image, Resolution},
    session::FrameSink,
};

/// A fixed-size window displaying [`Image`]s.
///
/// Pressing `Q` or `Escape`, or closing the window, requests the session to stop.
pub struct Window {
    win: minifb::Window,
    buf: Vec<u32>,
}

impl Window {
    /// Opens a window whose client area has the given resolution.
    pub fn open(title: &str, res: Resolution) -> anyhow::Result<Self> {
        let win = minifb::Window::new(
            title,
            res.width() as usize,
            res.height() as usize,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| anyhow!("failed to open window '{title}': {e}"))?;

        log::debug!("opened {res} window '{title}'");
        Ok(Self {
            win,
            buf: Vec::with_capacity(res.num_pixels() as usize),
        })
    }

    /// Displays `image`, replacing the previous contents of the window.
    ///
    /// Images that don't match the window size are stretched to fit.
    pub fn show(&mut self, image: &Image) -> anyhow::Result<()> {
        self.buf.clear();
        self.buf.extend(image.pixels().map(|color| color.to_0rgb()));
        self.win
            .update_with_buffer(&self.buf, image.width() as usize, image.height() as usize)
            .map_err(|e| anyhow!("failed to update window: {e}"))
    }

    /// Returns whether the window was closed or a quit key is held down.
    pub fn exit_requested(&self) -> bool {
        !self.win.is_open() || self.win.is_key_down(Key::Q) || self.win.is_key_down(Key::Escape)
    }
}

impl FrameSink for Window {
    fn show(&mut self, image: &Image) -> anyhow::Result<()> {
        Window::show(self, image)
    }

    fn poll_exit(&mut self) -> bool {
        self.exit_requested()
    }
}
