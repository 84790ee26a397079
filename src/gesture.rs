//! Gesture classification.
//!
//! A finger counts as raised when its tip is *above* its PIP joint in the image, ie. when the
//! tip's row is strictly smaller (rows grow downwards).

use std::fmt;

use crate::hand::{HandObservation, Keypoint, LandmarkIdx};

/// What the brush does this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    /// Only the index finger is raised: paint with the brush.
    Draw,
    /// Index and middle finger are raised: paint with the eraser.
    Erase,
    /// Any other pose, or no hand at all: the brush is lifted.
    Idle,
}

impl DrawMode {
    /// Derives the mode from which of the two tracked fingers are raised.
    pub fn from_fingers(fingers: FingerState) -> Self {
        match (fingers.index_up, fingers.middle_up) {
            (true, false) => Self::Draw,
            (true, true) => Self::Erase,
            (false, _) => Self::Idle,
        }
    }
}

impl fmt::Display for DrawMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draw => "draw",
            Self::Erase => "erase",
            Self::Idle => "idle",
        })
    }
}

/// Which of the gesture-relevant fingers are raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FingerState {
    pub index_up: bool,
    pub middle_up: bool,
}

impl FingerState {
    /// Computes the finger state of a hand.
    ///
    /// Returns `None` if the observation lacks any of the required keypoints.
    pub fn of(hand: &HandObservation) -> Option<Self> {
        Some(Self {
            index_up: is_up(
                hand.get(LandmarkIdx::IndexFingerTip)?,
                hand.get(LandmarkIdx::IndexFingerPip)?,
            ),
            middle_up: is_up(
                hand.get(LandmarkIdx::MiddleFingerTip)?,
                hand.get(LandmarkIdx::MiddleFingerPip)?,
            ),
        })
    }
}

fn is_up(tip: Keypoint, pip: Keypoint) -> bool {
    tip.y() < pip.y()
}

/// Classifies a hand pose into a [`DrawMode`] and a cursor.
///
/// The cursor is the index finger tip whenever a hand is present, even in [`DrawMode::Idle`];
/// callers decide whether to use it. A missing hand, or one that does not have exactly one
/// keypoint per [`LandmarkIdx`], yields `(DrawMode::Idle, None)`.
pub fn classify(hand: Option<&HandObservation>) -> (DrawMode, Option<Keypoint>) {
    let Some(hand) = hand.filter(|hand| hand.is_complete()) else {
        return (DrawMode::Idle, None);
    };

    match (FingerState::of(hand), hand.get(LandmarkIdx::IndexFingerTip)) {
        (Some(fingers), Some(cursor)) => (DrawMode::from_fingers(fingers), Some(cursor)),
        _ => (DrawMode::Idle, None),
    }
}
