//! Hand landmark estimation with an ONNX network.
//!
//! The network is expected to follow the MediaPipe hand landmark model's interface: a single
//! `1x3xHxW` (NCHW) input with RGB values scaled to `[0, 1]`, and at least three outputs:
//!
//! 0. `1x63` screen landmarks: `[x, y, z]` for each of the 21 keypoints, in input pixels.
//! 1. `1x1` hand presence score.
//! 2. `1x1` handedness.
//!
//! No palm detection is performed: the whole frame is scaled to the network's input resolution,
//! so the hand should take up a good part of the frame.

use std::{path::Path, sync::Arc};

use anyhow::{bail, Context};
use tract_onnx::prelude::{
    tvec, Framework, Graph, InferenceModelExt, SimplePlan, TValue, Tensor, TypedFact, TypedOp,
};

use crate::{
    image::{Image, Resolution},
    timer::Timer,
};

use super::{HandLandmarks, LandmarkProvider, NUM_LANDMARKS};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Options for [`OnnxLandmarker`].
#[derive(Debug, Clone, Copy)]
pub struct LandmarkerOptions {
    min_confidence: f32,
}

impl Default for LandmarkerOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
        }
    }
}

impl LandmarkerOptions {
    /// Sets the hand presence score below which estimates are discarded.
    ///
    /// Defaults to 0.7.
    #[inline]
    pub fn min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }
}

/// A [`LandmarkProvider`] running a hand landmark network through `tract`.
///
/// Reports at most one hand per frame.
pub struct OnnxLandmarker {
    model: Model,
    input_res: Resolution,
    options: LandmarkerOptions,
    t_resize: Timer,
    t_infer: Timer,
}

impl OnnxLandmarker {
    /// Loads a hand landmark network from an ONNX file.
    pub fn load(path: impl AsRef<Path>, options: LandmarkerOptions) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref(), options)
    }

    fn load_impl(path: &Path, options: LandmarkerOptions) -> anyhow::Result<Self> {
        match path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => bail!(
                "hand landmark network path '{}' must have `.onnx` extension",
                path.display()
            ),
        }

        let model_data = std::fs::read(path)
            .with_context(|| format!("failed to read hand landmark network '{}'", path.display()))?;
        Self::from_onnx(&model_data, options)
    }

    /// Loads a hand landmark network from an in-memory ONNX file.
    pub fn from_onnx(raw: &[u8], options: LandmarkerOptions) -> anyhow::Result<Self> {
        let graph = tract_onnx::onnx()
            .model_for_read(&mut &*raw)?
            .into_optimized()?;

        let fact = graph.input_fact(0)?;
        let Some(&[1, 3, height, width]) = fact.shape.as_concrete() else {
            bail!(
                "unsupported hand landmark network input shape {:?} (expected 1x3xHxW)",
                fact.shape
            );
        };
        let input_res = Resolution::new(width as u32, height as u32);

        let num_outputs = graph.output_outlets()?.len();
        if num_outputs < 3 {
            bail!("hand landmark network has {num_outputs} outputs, expected at least 3");
        }

        let model = SimplePlan::new(graph)?;
        log::debug!("loaded hand landmark network with input resolution {input_res}");

        Ok(Self {
            model,
            input_res,
            options,
            t_resize: Timer::new("resize"),
            t_infer: Timer::new("landmarks"),
        })
    }

    fn input_tensor(&self, image: &Image) -> anyhow::Result<Tensor> {
        let (w, h) = (self.input_res.width(), self.input_res.height());
        let resized = image.resize(self.input_res);

        let plane = (w * h) as usize;
        let mut data = vec![0.0f32; 3 * plane];
        for (i, color) in resized.pixels().enumerate() {
            data[i] = f32::from(color.r()) / 255.0;
            data[plane + i] = f32::from(color.g()) / 255.0;
            data[2 * plane + i] = f32::from(color.b()) / 255.0;
        }

        Ok(Tensor::from_shape(&[1, 3, h as usize, w as usize], &data)?)
    }
}

impl LandmarkProvider for OnnxLandmarker {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<HandLandmarks>> {
        let input = self.t_resize.time(|| self.input_tensor(image))?;
        let outputs = self
            .t_infer
            .time(|| self.model.run(tvec![TValue::from_const(Arc::new(input))]))?;

        accept(
            outputs[0].as_slice::<f32>()?,
            outputs[1].as_slice::<f32>()?,
            self.input_res,
            &self.options,
        )
    }

    fn timers(&self) -> Vec<&Timer> {
        vec![&self.t_resize, &self.t_infer]
    }
}

/// Turns the network's landmark and presence outputs into at most one hand.
///
/// Hands whose presence score is below [`LandmarkerOptions::min_confidence`] are dropped.
fn accept(
    screen_landmarks: &[f32],
    presence: &[f32],
    input_res: Resolution,
    options: &LandmarkerOptions,
) -> anyhow::Result<Vec<HandLandmarks>> {
    if screen_landmarks.len() < NUM_LANDMARKS * 3 || presence.is_empty() {
        bail!(
            "unexpected hand landmark network output sizes {} and {}",
            screen_landmarks.len(),
            presence.len(),
        );
    }

    let confidence = presence[0];
    if confidence < options.min_confidence {
        log::trace!("discarding hand with confidence {confidence:.2}");
        return Ok(Vec::new());
    }

    Ok(vec![extract(screen_landmarks, input_res).with_confidence(confidence)])
}

/// Normalizes `[x, y, z]` landmarks given in pixels of an `input_res` image.
fn extract(screen_landmarks: &[f32], input_res: Resolution) -> HandLandmarks {
    let (w, h) = (input_res.width() as f32, input_res.height() as f32);
    let positions = screen_landmarks
        .chunks_exact(3)
        .take(NUM_LANDMARKS)
        .map(|xyz| [xyz[0] / w, xyz[1] / h])
        .collect();
    HandLandmarks::new(positions)
}
