//! Hand landmarks.
//!
//! A [`LandmarkProvider`] estimates [`HandLandmarks`] (21 keypoints in normalized image
//! coordinates) for every hand in a frame. [`HandLandmarks::to_observation`] maps those into a
//! [`HandObservation`] in the frame's pixel space, which is what the gesture classifier consumes.

pub mod landmark;

use itertools::Itertools;

use crate::{
    image::{draw, Color, Image, Resolution},
    timer::Timer,
};

/// Number of keypoints in a complete hand.
pub const NUM_LANDMARKS: usize = 21;

/// Names for the hand pose landmarks.
///
/// The discriminant of each variant is the keypoint's index within a hand.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl LandmarkIdx {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Bone chains of the hand skeleton; every adjacent pair in a chain is connected.
const SKELETON: &[&[LandmarkIdx]] = {
    use LandmarkIdx::*;
    &[
        &[Wrist, ThumbCmc, ThumbMcp, ThumbIp, ThumbTip],
        &[Wrist, IndexFingerMcp, IndexFingerPip, IndexFingerDip, IndexFingerTip],
        &[MiddleFingerMcp, MiddleFingerPip, MiddleFingerDip, MiddleFingerTip],
        &[RingFingerMcp, RingFingerPip, RingFingerDip, RingFingerTip],
        &[Wrist, PinkyMcp, PinkyPip, PinkyDip, PinkyTip],
        // Knuckles:
        &[IndexFingerMcp, MiddleFingerMcp, RingFingerMcp, PinkyMcp],
    ]
};

/// Raw output of a [`LandmarkProvider`] for a single hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    /// `[x, y]` per keypoint, normalized to `[0, 1]` across the image's width and height.
    positions: Vec<[f32; 2]>,
    confidence: f32,
}

impl HandLandmarks {
    /// Creates a landmark set from normalized `[x, y]` positions.
    ///
    /// Providers are expected to produce exactly [`NUM_LANDMARKS`] positions in [`LandmarkIdx`]
    /// order, but this is not enforced here: incomplete sets are rejected when classified.
    pub fn new(positions: Vec<[f32; 2]>) -> Self {
        Self {
            positions,
            confidence: 1.0,
        }
    }

    pub fn with_confidence(self, confidence: f32) -> Self {
        Self { confidence, ..self }
    }

    #[inline]
    pub fn positions(&self) -> &[[f32; 2]] {
        &self.positions
    }

    /// Returns the estimator's confidence that this is actually a hand, from 0.0 to 1.0.
    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Maps the normalized positions into pixel coordinates of an image with resolution `res`.
    pub fn to_observation(&self, res: Resolution) -> HandObservation {
        HandObservation {
            keypoints: self
                .positions
                .iter()
                .enumerate()
                .map(|(id, &[x, y])| {
                    let (x, y) = res.denormalize(x, y);
                    Keypoint { id, x, y }
                })
                .collect(),
        }
    }
}

/// Estimates hand keypoints in camera frames.
///
/// Confidence thresholds and tracking are the provider's concern; every returned hand is taken at
/// face value. Hands are returned in order of preference, and only the first one is used for
/// drawing.
pub trait LandmarkProvider {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<HandLandmarks>>;

    /// Returns profiling timers to include in the periodic statistics log.
    fn timers(&self) -> Vec<&Timer> {
        Vec::new()
    }
}

impl<P: LandmarkProvider + ?Sized> LandmarkProvider for &mut P {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<HandLandmarks>> {
        (**self).detect(image)
    }

    fn timers(&self) -> Vec<&Timer> {
        (**self).timers()
    }
}

impl<P: LandmarkProvider + ?Sized> LandmarkProvider for Box<P> {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<HandLandmarks>> {
        (**self).detect(image)
    }

    fn timers(&self) -> Vec<&Timer> {
        (**self).timers()
    }
}

/// A labeled hand landmark in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keypoint {
    id: usize,
    x: i32,
    y: i32,
}

impl Keypoint {
    pub fn new(id: usize, x: i32, y: i32) -> Self {
        Self { id, x, y }
    }

    /// Index of this keypoint in the anatomical hand model (see [`LandmarkIdx`]).
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Pixel column.
    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Pixel row. Rows grow downwards.
    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }
}

/// The keypoints of one hand, in pixel coordinates of the frame it was observed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandObservation {
    keypoints: Vec<Keypoint>,
}

impl HandObservation {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    #[inline]
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Returns `true` if this observation has exactly one keypoint per [`LandmarkIdx`], in order.
    ///
    /// Only complete observations can be interpreted.
    pub fn is_complete(&self) -> bool {
        self.keypoints.len() == NUM_LANDMARKS
            && self.keypoints.iter().enumerate().all(|(i, kp)| kp.id == i)
    }

    /// Looks up a keypoint by its anatomical name.
    ///
    /// Returns `None` if the observation does not contain the keypoint at the expected position.
    pub fn get(&self, idx: LandmarkIdx) -> Option<Keypoint> {
        self.keypoints
            .get(idx.index())
            .copied()
            .filter(|kp| kp.id == idx.index())
    }

    /// Draws the hand skeleton and keypoints onto `target`.
    ///
    /// Incomplete observations only get their keypoints drawn.
    pub fn draw(&self, target: &mut Image) {
        if self.is_complete() {
            for chain in SKELETON {
                for (a, b) in chain.iter().tuple_windows() {
                    let (a, b) = (self.keypoints[a.index()], self.keypoints[b.index()]);
                    draw::line(target, a.x, a.y, b.x, b.y)
                        .color(Color::from_rgb8(224, 224, 224))
                        .stroke_width(2);
                }
            }
        }
        for kp in &self.keypoints {
            draw::marker(target, kp.x, kp.y).color(Color::RED);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_hand() -> HandObservation {
        HandObservation::new(
            (0..NUM_LANDMARKS)
                .map(|i| Keypoint::new(i, 10 + i as i32, 40 - i as i32))
                .collect(),
        )
    }

    #[test]
    fn skeleton_connects_every_landmark() {
        let mut connections = SKELETON
            .iter()
            .flat_map(|chain| chain.iter().tuple_windows())
            .collect::<Vec<(_, _)>>();
        assert_eq!(connections.len(), NUM_LANDMARKS);

        connections.sort_by_key(|(a, b)| (a.index(), b.index()));
        connections.dedup();
        assert_eq!(connections.len(), NUM_LANDMARKS, "duplicate bone");

        for i in 0..NUM_LANDMARKS {
            assert!(
                connections
                    .iter()
                    .any(|(a, b)| a.index() == i || b.index() == i),
                "landmark {i} is not connected"
            );
        }
    }

    #[test]
    fn landmark_indices() {
        assert_eq!(LandmarkIdx::Wrist.index(), 0);
        assert_eq!(LandmarkIdx::IndexFingerPip.index(), 6);
        assert_eq!(LandmarkIdx::IndexFingerTip.index(), 8);
        assert_eq!(LandmarkIdx::MiddleFingerPip.index(), 10);
        assert_eq!(LandmarkIdx::MiddleFingerTip.index(), 12);
        assert_eq!(LandmarkIdx::PinkyTip.index(), NUM_LANDMARKS - 1);
    }

    #[test]
    fn to_observation_scales_to_pixels() {
        let positions = (0..NUM_LANDMARKS)
            .map(|i| [i as f32 / 32.0, 0.5])
            .collect::<Vec<_>>();
        let obs = HandLandmarks::new(positions).to_observation(Resolution::new(640, 480));

        assert!(obs.is_complete());
        let tip = obs.get(LandmarkIdx::IndexFingerTip).unwrap();
        assert_eq!(tip, Keypoint::new(8, 160, 240));
        assert_eq!(obs.keypoints()[20], Keypoint::new(20, 400, 240));
    }

    #[test]
    fn completeness() {
        assert!(complete_hand().is_complete());

        let mut short = complete_hand().keypoints;
        short.pop();
        let short = HandObservation::new(short);
        assert!(!short.is_complete());
        assert!(short.get(LandmarkIdx::IndexFingerTip).is_some());
        assert!(short.get(LandmarkIdx::PinkyTip).is_none());

        let mut shuffled = complete_hand().keypoints;
        shuffled.swap(6, 8);
        let shuffled = HandObservation::new(shuffled);
        assert!(!shuffled.is_complete());
        assert!(shuffled.get(LandmarkIdx::IndexFingerTip).is_none());
    }

    #[test]
    fn draw_marks_keypoints() {
        let mut image = Image::new(64, 64);
        let hand = complete_hand();
        hand.draw(&mut image);
        for kp in hand.keypoints() {
            assert_eq!(image.get(kp.x() as u32, kp.y() as u32), Color::RED);
        }
    }
}
