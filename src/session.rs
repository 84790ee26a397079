//! The per-frame painting loop.
//!
//! A [`Session`] pulls frames from a [`FrameSource`], mirrors them, asks a [`LandmarkProvider`]
//! for hands, classifies the first hand's pose, advances the [`StrokeEngine`], composites the
//! canvas over the frame and hands the result to a [`FrameSink`]. Exactly one frame is in flight
//! at a time.

use anyhow::{bail, Context};

use crate::{
    gesture::{self, DrawMode},
    hand::LandmarkProvider,
    image::{self, Color, Image, Resolution},
    stroke::{Brush, CursorState, StrokeEngine},
    timer::{FpsCounter, Timer},
};

/// A source of camera frames.
pub trait FrameSource {
    /// Returns the next frame, blocking until one is available.
    fn next_frame(&mut self) -> anyhow::Result<Image>;

    /// Returns profiling timers to include in the periodic statistics log.
    fn timers(&self) -> Vec<&Timer> {
        Vec::new()
    }
}

/// Somewhere to display composited frames, and where the user can ask to stop.
pub trait FrameSink {
    fn show(&mut self, image: &Image) -> anyhow::Result<()>;

    /// Returns `true` when the session should end.
    fn poll_exit(&mut self) -> bool;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn next_frame(&mut self) -> anyhow::Result<Image> {
        (**self).next_frame()
    }

    fn timers(&self) -> Vec<&Timer> {
        (**self).timers()
    }
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn show(&mut self, image: &Image) -> anyhow::Result<()> {
        (**self).show(image)
    }

    fn poll_exit(&mut self) -> bool {
        (**self).poll_exit()
    }
}

/// Largest accepted brush or eraser thickness, in pixels.
pub const MAX_THICKNESS: u32 = 4096;

/// Session configuration.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    resolution: Resolution,
    draw_color: Color,
    brush_thickness: u32,
    eraser_thickness: u32,
    cutoff: u8,
    show_landmarks: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            resolution: Resolution::RES_720P,
            draw_color: Color::MAGENTA,
            brush_thickness: 15,
            eraser_thickness: 100,
            cutoff: image::DEFAULT_CUTOFF,
            show_landmarks: true,
        }
    }
}

impl SessionOptions {
    /// Sets the resolution of the canvas. Every frame must have this resolution.
    ///
    /// Defaults to 1280x720.
    #[inline]
    pub fn resolution(self, resolution: Resolution) -> Self {
        Self { resolution, ..self }
    }

    /// Sets the brush color. Defaults to magenta.
    #[inline]
    pub fn draw_color(self, draw_color: Color) -> Self {
        Self { draw_color, ..self }
    }

    /// Sets the width of drawn lines in pixels. Defaults to 15.
    #[inline]
    pub fn brush_thickness(self, brush_thickness: u32) -> Self {
        Self {
            brush_thickness,
            ..self
        }
    }

    /// Sets the width of erased lines in pixels. Defaults to 100.
    #[inline]
    pub fn eraser_thickness(self, eraser_thickness: u32) -> Self {
        Self {
            eraser_thickness,
            ..self
        }
    }

    /// Sets the canvas intensity above which a canvas pixel covers the live frame.
    ///
    /// Defaults to [`image::DEFAULT_CUTOFF`].
    #[inline]
    pub fn cutoff(self, cutoff: u8) -> Self {
        Self { cutoff, ..self }
    }

    /// Sets whether the detected hand's skeleton is drawn over the live frame. Defaults to `true`.
    #[inline]
    pub fn show_landmarks(self, show_landmarks: bool) -> Self {
        Self {
            show_landmarks,
            ..self
        }
    }

    #[inline]
    pub fn get_resolution(&self) -> Resolution {
        self.resolution
    }

    /// Checks that the options describe a usable session.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.resolution.is_empty() {
            bail!("session resolution {} is empty", self.resolution);
        }
        for (what, thickness) in [
            ("brush", self.brush_thickness),
            ("eraser", self.eraser_thickness),
        ] {
            if thickness == 0 || thickness > MAX_THICKNESS {
                bail!("{what} thickness {thickness} is outside of 1..={MAX_THICKNESS}");
            }
        }
        let intensity = self.draw_color.intensity();
        if intensity <= self.cutoff {
            bail!(
                "draw color {:?} has intensity {}, which does not exceed the cutoff {}; strokes would be invisible",
                self.draw_color,
                intensity,
                self.cutoff,
            );
        }
        Ok(())
    }
}

/// State of a painting session.
pub struct Session {
    options: SessionOptions,
    engine: StrokeEngine,
    cursor: CursorState,
    mode: DrawMode,
    t_capture: Timer,
    t_detect: Timer,
    t_stroke: Timer,
    t_composite: Timer,
    t_show: Timer,
}

impl Session {
    /// Creates a session with a blank canvas.
    pub fn new(options: SessionOptions) -> anyhow::Result<Self> {
        options.validate().context("invalid session options")?;
        log::debug!("session options: {:?}", options);

        let engine = StrokeEngine::new(
            options.resolution,
            Brush::new(options.draw_color, options.brush_thickness),
            Brush::eraser(options.eraser_thickness),
        );
        Ok(Self {
            options,
            engine,
            cursor: CursorState::Inactive,
            mode: DrawMode::Idle,
            t_capture: Timer::new("capture"),
            t_detect: Timer::new("detect"),
            t_stroke: Timer::new("stroke"),
            t_composite: Timer::new("composite"),
            t_show: Timer::new("show"),
        })
    }

    #[inline]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Returns the canvas holding every stroke drawn so far.
    #[inline]
    pub fn canvas(&self) -> &Image {
        self.engine.canvas()
    }

    #[inline]
    pub fn cursor(&self) -> CursorState {
        self.cursor
    }

    /// Returns the mode determined for the most recently processed frame.
    #[inline]
    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    /// Returns the session's own profiling timers, in pipeline order.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [
            &self.t_capture,
            &self.t_detect,
            &self.t_stroke,
            &self.t_composite,
            &self.t_show,
        ]
        .into_iter()
    }

    /// Collects the timers of the session and of the collaborators it drives.
    ///
    /// The source's timers come first and the provider's follow the session's `detect` timer, so
    /// the statistics line reads in pipeline order.
    pub fn pipeline_timers<'a, S, P>(&'a self, source: &'a S, provider: &'a P) -> Vec<&'a Timer>
    where
        S: FrameSource + ?Sized,
        P: LandmarkProvider + ?Sized,
    {
        let mut timers = Vec::new();
        timers.push(&self.t_capture);
        timers.extend(source.timers());
        timers.push(&self.t_detect);
        timers.extend(provider.timers());
        timers.extend([&self.t_stroke, &self.t_composite, &self.t_show]);
        timers
    }

    /// Runs a single (already mirrored) frame through the pipeline and returns the frame to
    /// display.
    ///
    /// Fails if the frame's resolution differs from the canvas, or if `provider` fails.
    pub fn process_frame<P: LandmarkProvider>(
        &mut self,
        mut frame: Image,
        provider: &mut P,
    ) -> anyhow::Result<Image> {
        if frame.resolution() != self.options.resolution {
            bail!(
                "frame resolution {} does not match the session resolution {}",
                frame.resolution(),
                self.options.resolution,
            );
        }

        let hands = self
            .t_detect
            .time(|| provider.detect(&frame))
            .context("hand landmark estimation failed")?;
        if let Some(hand) = hands.first() {
            log::trace!(
                "{} hand(s) detected, using the first one (confidence {:.2})",
                hands.len(),
                hand.confidence(),
            );
        }
        let observation = hands
            .first()
            .map(|hand| hand.to_observation(frame.resolution()));

        let (mode, cursor) = gesture::classify(observation.as_ref());
        if mode != self.mode {
            log::debug!("mode: {} -> {}", self.mode, mode);
            self.mode = mode;
        }

        if self.options.show_landmarks {
            if let Some(observation) = &observation {
                observation.draw(&mut frame);
            }
        }

        let state = self.cursor;
        let engine = &mut self.engine;
        self.cursor = self
            .t_stroke
            .time(|| engine.advance(mode, cursor, state, &mut frame));

        let cutoff = self.options.cutoff;
        let canvas = self.engine.canvas();
        self.t_composite
            .time(|| image::composite_in_place(&mut frame, canvas, cutoff))?;
        Ok(frame)
    }

    /// Runs the session until `sink` requests an exit or an error occurs.
    ///
    /// Captured frames are mirrored horizontally before processing, so that the user's movements
    /// appear on screen like in a mirror.
    pub fn run<S, P, K>(&mut self, mut source: S, mut provider: P, mut sink: K) -> anyhow::Result<()>
    where
        S: FrameSource,
        P: LandmarkProvider,
        K: FrameSink,
    {
        let mut fps = FpsCounter::new("session");

        loop {
            let mut frame = self
                .t_capture
                .time(|| source.next_frame())
                .context("failed to capture frame")?;
            frame.flip_horizontal_in_place();

            let display = self.process_frame(frame, &mut provider)?;

            self.t_show
                .time(|| sink.show(&display))
                .context("failed to display frame")?;
            if sink.poll_exit() {
                log::info!("exit requested, ending session");
                return Ok(());
            }

            fps.tick_with(self.pipeline_timers(&source, &provider));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::hand::{HandLandmarks, NUM_LANDMARKS};

    use super::*;

    const RES: Resolution = Resolution::new(64, 48);

    fn options() -> SessionOptions {
        SessionOptions::default()
            .resolution(RES)
            .brush_thickness(3)
            .eraser_thickness(9)
            .show_landmarks(false)
    }

    /// A provider returning the same hands for every frame.
    struct Fixed(Vec<HandLandmarks>);

    impl LandmarkProvider for Fixed {
        fn detect(&mut self, _: &Image) -> anyhow::Result<Vec<HandLandmarks>> {
            Ok(self.0.clone())
        }
    }

    /// A hand pointing with the index finger at pixel `(x, y)` of a `RES` frame.
    fn pointing(x: u32, y: u32) -> HandLandmarks {
        let norm = |px: u32, len: u32| (px as f32 + 0.5) / len as f32;
        let positions = (0..NUM_LANDMARKS)
            .map(|id| {
                let (px, py) = match id {
                    8 => (x, y),
                    6 => (x, y + 10),
                    12 => (x + 4, y + 12),
                    10 => (x + 4, y + 6),
                    _ => (x, y + 20),
                };
                [norm(px, RES.width()), norm(py, RES.height())]
            })
            .collect();
        HandLandmarks::new(positions)
    }

    #[test]
    fn default_options_are_valid() {
        SessionOptions::default().validate().unwrap();
        let opts = SessionOptions::default();
        assert_eq!(opts.get_resolution(), Resolution::new(1280, 720));
        assert_eq!(opts.brush_thickness, 15);
        assert_eq!(opts.eraser_thickness, 100);
        assert_eq!(opts.cutoff, 50);
        assert_eq!(opts.draw_color, Color::MAGENTA);
    }

    #[test]
    fn invalid_options() {
        assert!(options().brush_thickness(0).validate().is_err());
        assert!(options().eraser_thickness(0).validate().is_err());
        options()
            .brush_thickness(MAX_THICKNESS)
            .eraser_thickness(MAX_THICKNESS)
            .validate()
            .unwrap();
        let err = options()
            .brush_thickness(u32::MAX)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("brush thickness"), "{err}");
        assert!(options()
            .eraser_thickness(MAX_THICKNESS + 1)
            .validate()
            .is_err());
        assert!(options()
            .resolution(Resolution::new(0, 48))
            .validate()
            .is_err());

        // Pure blue has an intensity of 29, below the default cutoff.
        let err = options().draw_color(Color::BLUE).validate().unwrap_err();
        assert!(err.to_string().contains("cutoff"), "{err}");
        options()
            .draw_color(Color::BLUE)
            .cutoff(20)
            .validate()
            .unwrap();

        assert!(Session::new(options().brush_thickness(0)).is_err());
    }

    #[test]
    fn no_hand_passes_frame_through() {
        let mut session = Session::new(options()).unwrap();
        let mut frame = Image::with_resolution(RES);
        frame.clear(Color::from_rgb8(10, 120, 30));

        let out = session
            .process_frame(frame.clone(), &mut Fixed(Vec::new()))
            .unwrap();
        assert_eq!(out, frame);
        assert_eq!(session.mode(), DrawMode::Idle);
        assert_eq!(session.cursor(), CursorState::Inactive);
    }

    #[test]
    fn pointing_hand_draws() {
        let mut session = Session::new(options()).unwrap();
        let frame = Image::with_resolution(RES);

        session
            .process_frame(frame.clone(), &mut Fixed(vec![pointing(10, 10)]))
            .unwrap();
        assert_eq!(session.mode(), DrawMode::Draw);
        assert_eq!(session.cursor(), CursorState::Active { x: 10, y: 10 });

        let out = session
            .process_frame(frame, &mut Fixed(vec![pointing(30, 10)]))
            .unwrap();
        assert_eq!(session.canvas().get(20, 10), Color::MAGENTA);
        assert_eq!(out.get(20, 10), Color::MAGENTA);
        assert_eq!(out.get(20, 30), Color::BLACK);
    }

    #[test]
    fn only_first_hand_is_used() {
        let mut session = Session::new(options()).unwrap();
        let mut provider = Fixed(vec![pointing(40, 20), pointing(5, 5)]);
        session
            .process_frame(Image::with_resolution(RES), &mut provider)
            .unwrap();
        assert_eq!(session.cursor(), CursorState::Active { x: 40, y: 20 });
    }

    #[test]
    fn collaborator_timers_are_reported() {
        struct TimedCamera(Timer);
        impl FrameSource for TimedCamera {
            fn next_frame(&mut self) -> anyhow::Result<Image> {
                Ok(Image::with_resolution(RES))
            }

            fn timers(&self) -> Vec<&Timer> {
                vec![&self.0]
            }
        }

        struct TimedProvider(Timer);
        impl LandmarkProvider for TimedProvider {
            fn detect(&mut self, _: &Image) -> anyhow::Result<Vec<HandLandmarks>> {
                Ok(Vec::new())
            }

            fn timers(&self) -> Vec<&Timer> {
                vec![&self.0]
            }
        }

        let session = Session::new(options()).unwrap();
        let camera = TimedCamera(Timer::new("decode"));
        let provider = TimedProvider(Timer::new("infer"));
        let names = session
            .pipeline_timers(&camera, &provider)
            .iter()
            .map(|timer| timer.to_string())
            .map(|s| s[..s.find(':').unwrap()].to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            ["capture", "decode", "detect", "infer", "stroke", "composite", "show"]
        );

        // Providers without timers contribute nothing.
        let names = session.pipeline_timers(&camera, &Fixed(Vec::new())).len();
        assert_eq!(names, 6);
    }

    #[test]
    fn wrong_frame_size_is_an_error() {
        let mut session = Session::new(options()).unwrap();
        let err = session
            .process_frame(Image::new(32, 48), &mut Fixed(Vec::new()))
            .unwrap_err();
        assert!(err.to_string().contains("32x48"), "{err}");
    }

    #[test]
    fn provider_errors_propagate() {
        struct Broken;
        impl LandmarkProvider for Broken {
            fn detect(&mut self, _: &Image) -> anyhow::Result<Vec<HandLandmarks>> {
                anyhow::bail!("model exploded")
            }
        }

        let mut session = Session::new(options()).unwrap();
        let err = session
            .process_frame(Image::with_resolution(RES), &mut Broken)
            .unwrap_err();
        assert!(format!("{err:#}").contains("model exploded"), "{err:#}");
    }
}
