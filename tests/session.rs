use std::collections::VecDeque;

use fingerpaint::{
    hand::{HandLandmarks, LandmarkProvider, NUM_LANDMARKS},
    image::{Color, Image, Resolution},
    session::{FrameSink, FrameSource, Session, SessionOptions},
};

const RES: Resolution = Resolution::new(320, 240);
const GRAY: Color = Color::from_rgb8(128, 128, 128);

/// One frame worth of hand pose: index tip position and which fingers are raised.
#[derive(Clone, Copy)]
struct Pose {
    x: u32,
    y: u32,
    index_up: bool,
    middle_up: bool,
}

fn draw(x: u32, y: u32) -> Option<Pose> {
    Some(Pose {
        x,
        y,
        index_up: true,
        middle_up: false,
    })
}

fn erase(x: u32, y: u32) -> Option<Pose> {
    Some(Pose {
        x,
        y,
        index_up: true,
        middle_up: true,
    })
}

fn idle(x: u32, y: u32) -> Option<Pose> {
    Some(Pose {
        x,
        y,
        index_up: false,
        middle_up: false,
    })
}

impl Pose {
    /// Normalized landmarks placing each keypoint in the middle of its pixel.
    fn landmarks(self) -> HandLandmarks {
        let norm = |px: u32, len: u32| (px as f32 + 0.5) / len as f32;
        let bend = |up: bool| if up { 12 } else { -12 };
        let Pose {
            x,
            y,
            index_up,
            middle_up,
        } = self;
        let positions = (0..NUM_LANDMARKS)
            .map(|id| {
                let (px, py) = match id {
                    8 => (x, y),
                    6 => (x, (y as i32 + bend(index_up)) as u32),
                    12 => (x + 8, y),
                    10 => (x + 8, (y as i32 + bend(middle_up)) as u32),
                    _ => (x, y + 20),
                };
                [norm(px, RES.width()), norm(py, RES.height())]
            })
            .collect();
        HandLandmarks::new(positions)
    }
}

/// Delivers uniform gray frames.
struct GrayCamera {
    res: Resolution,
}

impl FrameSource for GrayCamera {
    fn next_frame(&mut self) -> anyhow::Result<Image> {
        let mut image = Image::with_resolution(self.res);
        image.clear(GRAY);
        Ok(image)
    }
}

/// Replays a fixed sequence of poses, one per frame.
struct Script(VecDeque<Option<Pose>>);

impl Script {
    fn new(poses: impl IntoIterator<Item = Option<Pose>>) -> Self {
        Self(poses.into_iter().collect())
    }
}

impl LandmarkProvider for Script {
    fn detect(&mut self, _: &Image) -> anyhow::Result<Vec<HandLandmarks>> {
        let pose = self.0.pop_front().expect("provider invoked more often than scripted");
        Ok(pose.map(Pose::landmarks).into_iter().collect())
    }
}

/// Records every displayed frame and asks to exit after `frames` frames.
struct Recorder {
    frames: usize,
    shown: Vec<Image>,
}

impl Recorder {
    fn new(frames: usize) -> Self {
        Self {
            frames,
            shown: Vec::new(),
        }
    }

    fn last(&self) -> &Image {
        self.shown.last().unwrap()
    }
}

impl FrameSink for Recorder {
    fn show(&mut self, image: &Image) -> anyhow::Result<()> {
        self.shown.push(image.clone());
        Ok(())
    }

    fn poll_exit(&mut self) -> bool {
        self.shown.len() >= self.frames
    }
}

fn options() -> SessionOptions {
    SessionOptions::default()
        .resolution(RES)
        .show_landmarks(false)
}

/// Runs `poses` through a fresh session, returning it and the displayed frames.
fn run(options: SessionOptions, poses: Vec<Option<Pose>>) -> (Session, Recorder) {
    let mut session = Session::new(options).unwrap();
    let mut recorder = Recorder::new(poses.len());
    session
        .run(GrayCamera { res: RES }, Script::new(poses), &mut recorder)
        .unwrap();
    assert_eq!(recorder.shown.len(), recorder.frames);
    (session, recorder)
}

#[test]
fn l_shaped_stroke() {
    let (session, recorder) = run(
        options(),
        vec![draw(100, 100), draw(150, 100), draw(150, 150)],
    );

    let canvas = session.canvas();
    let display = recorder.last();
    for (x, y) in [
        (100, 100),
        (125, 100),
        (150, 100),
        (150, 125),
        (150, 150),
        // Within half the brush thickness of the segments.
        (125, 106),
        (144, 125),
    ] {
        assert_eq!(canvas.get(x, y), Color::MAGENTA, "canvas at ({x}, {y})");
        assert_eq!(display.get(x, y), Color::MAGENTA, "display at ({x}, {y})");
    }

    // Inside of the L, and far away from it.
    for (x, y) in [(125, 130), (20, 200), (300, 20)] {
        assert_eq!(canvas.get(x, y), Color::BLACK, "canvas at ({x}, {y})");
        assert_eq!(display.get(x, y), GRAY, "display at ({x}, {y})");
    }

    // The first frame only starts the stroke.
    let first = &recorder.shown[0];
    assert_eq!(first.get(125, 100), GRAY);
}

#[test]
fn idle_frame_separates_strokes() {
    let (session, _) = run(
        options(),
        vec![
            draw(20, 20),
            draw(60, 20),
            idle(150, 100),
            draw(250, 200),
            draw(290, 200),
        ],
    );

    let canvas = session.canvas();
    assert_eq!(canvas.get(40, 20), Color::MAGENTA);
    assert_eq!(canvas.get(270, 200), Color::MAGENTA);

    // Nothing along the line that would connect the two strokes.
    for t in 1..10 {
        let x = 60 + (250 - 60) * t / 10;
        let y = 20 + (200 - 20) * t / 10;
        assert_eq!(canvas.get(x, y), Color::BLACK, "({x}, {y})");
    }
}

#[test]
fn erasing() {
    let (session, recorder) = run(
        options(),
        vec![
            draw(40, 120),
            draw(280, 120),
            idle(160, 30),
            erase(160, 30),
            erase(160, 210),
        ],
    );

    let canvas = session.canvas();
    let display = recorder.last();
    assert_eq!(canvas.get(160, 120), Color::BLACK);
    assert_eq!(display.get(160, 120), GRAY);
    for x in [60, 270] {
        assert_eq!(canvas.get(x, 120), Color::MAGENTA);
        assert_eq!(display.get(x, 120), Color::MAGENTA);
    }

    // The stroke was visible before the eraser passed.
    assert_eq!(recorder.shown[3].get(160, 120), Color::MAGENTA);
}

#[test]
fn erase_continues_from_last_draw_point() {
    let (session, recorder) = run(
        options(),
        vec![draw(40, 120), draw(280, 120), erase(160, 120)],
    );

    // The eraser segment runs from (280, 120) back to (160, 120).
    let canvas = session.canvas();
    for x in [170, 220, 270, 280] {
        assert_eq!(canvas.get(x, 120), Color::BLACK, "({x}, 120)");
        assert_eq!(recorder.last().get(x, 120), GRAY, "({x}, 120)");
    }
    assert_eq!(canvas.get(60, 120), Color::MAGENTA);
    assert_eq!(recorder.last().get(60, 120), Color::MAGENTA);
}

#[test]
fn absent_hand_leaves_frames_untouched() {
    let (session, recorder) = run(options(), vec![None, None, None]);

    assert!(session.canvas().pixels().all(|c| c == Color::BLACK));
    for frame in &recorder.shown {
        assert!(frame.pixels().all(|c| c == GRAY));
    }
}

#[test]
fn hand_leaving_ends_stroke() {
    let (session, _) = run(
        options(),
        vec![draw(20, 20), draw(60, 20), None, draw(250, 200)],
    );
    // The stroke restarts at the new position without painting.
    assert_eq!(session.cursor().position(), Some((250, 200)));
    assert_eq!(session.canvas().get(250, 200), Color::BLACK);
    assert_eq!(session.canvas().get(155, 110), Color::BLACK);
}

#[test]
fn skeleton_overlay() {
    let (session, recorder) = run(options().show_landmarks(true), vec![idle(200, 100)]);

    // Wrist marker, drawn on the display only.
    assert_eq!(recorder.last().get(200, 120), Color::RED);
    assert!(session.canvas().pixels().all(|c| c == Color::BLACK));
}

#[test]
fn mismatched_frame_size_fails() {
    let mut session = Session::new(options()).unwrap();
    let err = session
        .run(
            GrayCamera {
                res: Resolution::new(640, 480),
            },
            Script::new([None]),
            Recorder::new(1),
        )
        .unwrap_err();
    assert!(err.to_string().contains("640x480"), "{err}");
}
