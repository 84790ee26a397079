use std::env;

use anyhow::Context;
use fingerpaint::{
    gui::Window,
    hand::landmark::{LandmarkerOptions, OnnxLandmarker},
    session::{Session, SessionOptions},
    video::webcam::{Webcam, WebcamOptions},
};

const ENV_VAR_HAND_MODEL: &str = "FINGERPAINT_HAND_MODEL";

fn main() -> anyhow::Result<()> {
    fingerpaint::init_logger!();

    let model_path = env::var_os(ENV_VAR_HAND_MODEL).with_context(|| {
        format!("`{ENV_VAR_HAND_MODEL}` must be set to the path of an ONNX hand landmark network")
    })?;

    let options = SessionOptions::default();
    let res = options.get_resolution();

    let landmarker = OnnxLandmarker::load(&model_path, LandmarkerOptions::default())?;
    let webcam = Webcam::open(WebcamOptions::default().resolution(res).fps(30))?;
    let window = Window::open("Finger Paint", res)?;

    log::info!("raise your index finger to draw, index and middle finger to erase; Q quits");

    let mut session = Session::new(options)?;
    session.run(webcam, landmarker, window)
}
