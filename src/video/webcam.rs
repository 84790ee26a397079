//! V4L2 webcam access.
//!
//! Currently, only V4L2 `VIDEO_CAPTURE` devices yielding JFIF JPEG or Motion JPEG frames with
//! discrete frame sizes and intervals are supported.

use std::env;

use anyhow::bail;
use linuxvideo::{
    format::{FrameIntervals, FrameSizes, PixFormat, PixelFormat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device, Fract,
};

use crate::{
    image::{Image, Resolution},
    session::FrameSource,
    timer::Timer,
};

const ENV_VAR_WEBCAM_NAME: &str = "FINGERPAINT_WEBCAM_NAME";

/// Webcam options.
#[derive(Debug, Clone)]
pub struct WebcamOptions {
    name: Option<String>,
    resolution: Resolution,
    fps: Option<u32>,
}

impl Default for WebcamOptions {
    fn default() -> Self {
        Self {
            name: None,
            resolution: Resolution::RES_720P,
            fps: None,
        }
    }
}

impl WebcamOptions {
    /// Sets the name of the webcam device to open.
    ///
    /// If no webcam with the given name can be found, opening the webcam will result in an error.
    #[inline]
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Sets the resolution of the delivered frames.
    ///
    /// The smallest device resolution at least this large is selected, and frames are scaled to
    /// exactly this resolution if the device cannot deliver it. Defaults to 1280x720.
    #[inline]
    pub fn resolution(self, resolution: Resolution) -> Self {
        Self { resolution, ..self }
    }

    /// Sets the desired frame rate.
    ///
    /// A lower frame rate might be selected if the webcam cannot deliver it.
    #[inline]
    pub fn fps(self, fps: u32) -> Self {
        Self {
            fps: Some(fps),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FrameFormat {
    resolution: Resolution,
    frame_interval: Fract,
}

impl FrameFormat {
    fn fps(&self) -> f32 {
        1.0 / self.frame_interval.as_f32()
    }
}

fn negotiate_format(
    device: &Device,
    options: &WebcamOptions,
) -> anyhow::Result<(PixFormat, Fract)> {
    let mut pixel_format = None;
    for format in device.formats(BufType::VIDEO_CAPTURE) {
        let format = format?;
        if format.pixel_format() == PixelFormat::JPEG || format.pixel_format() == PixelFormat::MJPG {
            pixel_format = Some(format.pixel_format());
            break;
        }
    }

    let Some(pixel_format) = pixel_format else {
        bail!("no supported pixel format found");
    };

    let mut formats = Vec::new();
    match device.frame_sizes(pixel_format)? {
        FrameSizes::Discrete(sizes) => {
            for size in sizes {
                let intervals =
                    match device.frame_intervals(pixel_format, size.width(), size.height())? {
                        FrameIntervals::Discrete(intervals) => intervals,
                        FrameIntervals::Stepwise(_) | FrameIntervals::Continuous(_) => {
                            bail!("stepwise or continuous frame rates are not supported")
                        }
                    };
                for rate in intervals {
                    formats.push(FrameFormat {
                        resolution: Resolution::new(size.width(), size.height()),
                        frame_interval: *rate.fract(),
                    });
                }
            }
        }
        FrameSizes::Stepwise(_) | FrameSizes::Continuous(_) => {
            bail!("stepwise or continuous resolutions are not supported");
        }
    }

    let Some(fmt) = select_format(&formats, options.resolution, options.fps) else {
        bail!("device does not advertise any frame formats");
    };
    log::debug!(
        "selected {} @ {:.1}Hz out of {} formats",
        fmt.resolution,
        fmt.fps(),
        formats.len(),
    );

    Ok((
        PixFormat::new(
            fmt.resolution.width(),
            fmt.resolution.height(),
            pixel_format,
        ),
        fmt.frame_interval,
    ))
}

/// Picks the smallest format covering `resolution`, or the largest format if none does.
///
/// Among formats of the chosen resolution, the slowest one still reaching `fps` is preferred. If
/// no frame rate was requested, or none reaches it, the fastest one is used.
fn select_format(
    formats: &[FrameFormat],
    resolution: Resolution,
    fps: Option<u32>,
) -> Option<FrameFormat> {
    let covers = |fmt: &&FrameFormat| {
        fmt.resolution.width() >= resolution.width()
            && fmt.resolution.height() >= resolution.height()
    };
    let size = match formats.iter().filter(covers).min_by_key(|fmt| fmt.resolution.num_pixels()) {
        Some(fmt) => fmt.resolution,
        None => formats.iter().max_by_key(|fmt| fmt.resolution.num_pixels())?.resolution,
    };

    let mut candidates = formats
        .iter()
        .filter(|fmt| fmt.resolution == size)
        .copied()
        .collect::<Vec<_>>();
    // Fastest first.
    candidates.sort_by_key(|fmt| fmt.frame_interval);
    let fastest = candidates.first().copied();
    match fps {
        Some(fps) => candidates
            .iter()
            .rev()
            .find(|fmt| fmt.fps().round() >= fps as f32)
            .copied()
            .or(fastest),
        None => fastest,
    }
}

/// A webcam yielding a stream of [`Image`]s at a fixed resolution.
pub struct Webcam {
    stream: ReadStream,
    device_res: Resolution,
    output_res: Resolution,
    t_dequeue: Timer,
    t_decode: Timer,
}

impl Webcam {
    /// Opens the first supported webcam found.
    ///
    /// This function can block for a significant amount of time while the webcam initializes (on
    /// the order of hundreds of milliseconds).
    pub fn open(options: WebcamOptions) -> anyhow::Result<Self> {
        if let Ok(name) = env::var(ENV_VAR_WEBCAM_NAME) {
            log::debug!(
                "webcam override: `{}` is set to '{}'",
                ENV_VAR_WEBCAM_NAME,
                name,
            );
        }
        for res in linuxvideo::list()? {
            match res {
                Ok(dev) => match Self::open_impl(dev, &options) {
                    Ok(Some(webcam)) => return Ok(webcam),
                    Ok(None) => {}
                    Err(e) => {
                        log::debug!("{}", e);
                    }
                },
                Err(e) => {
                    log::warn!("{}", e);
                }
            }
        }

        bail!("no supported webcam device found")
    }

    fn open_impl(dev: Device, options: &WebcamOptions) -> anyhow::Result<Option<Self>> {
        let caps = dev.capabilities()?;
        let cam_name_from_env = env::var(ENV_VAR_WEBCAM_NAME).ok();
        if let Some(name) = options.name.as_deref().or(cam_name_from_env.as_deref()) {
            if caps.card() != name {
                return Ok(None);
            }
        }

        let cap_flags = caps.device_capabilities();
        let path = dev.path()?;
        log::debug!(
            "device {} ({}) capabilities: {:?}",
            caps.card(),
            path.display(),
            cap_flags,
        );

        if !cap_flags.contains(CapabilityFlags::VIDEO_CAPTURE) {
            return Ok(None);
        }

        let (pixfmt, fract) = negotiate_format(&dev, options)?;
        let capture = dev.video_capture(pixfmt)?;

        let format = capture.format();
        let device_res = Resolution::new(format.width(), format.height());
        let actual = capture.set_frame_interval(fract)?;

        log::info!(
            "opened {} ({}), {} @ {:.1}Hz",
            caps.card(),
            path.display(),
            device_res,
            1.0 / actual.as_f32(),
        );
        if device_res != options.resolution {
            log::info!("frames will be scaled to {}", options.resolution);
        }

        let stream = capture.into_stream()?;

        Ok(Some(Self {
            stream,
            device_res,
            output_res: options.resolution,
            t_dequeue: Timer::new("dequeue"),
            t_decode: Timer::new("decode"),
        }))
    }

    /// Returns the resolution of the delivered frames.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.output_res
    }

    /// Reads the next frame from the camera.
    ///
    /// If no frame is available, this method will block until one is.
    pub fn read(&mut self) -> anyhow::Result<Image> {
        let dequeue_guard = self.t_dequeue.start();
        let (device_res, output_res) = (self.device_res, self.output_res);
        let t_decode = &self.t_decode;
        self.stream
            .dequeue(|buf| {
                drop(dequeue_guard);
                let image = match t_decode.time(|| Image::decode_jpeg(&buf)) {
                    Ok(image) => image,
                    Err(e) => {
                        // Even good webcams produce the occasional corrupted MJPG frame. Skipping
                        // it would double the latency, so a blank frame is handed back instead.
                        log::error!("webcam decode error: {:#}", e);
                        Image::with_resolution(output_res)
                    }
                };
                if image.resolution() != output_res {
                    if image.resolution() != device_res {
                        log::warn!(
                            "webcam delivered a {} frame, expected {}",
                            image.resolution(),
                            device_res,
                        );
                    }
                    return Ok(image.resize(output_res));
                }
                Ok(image)
            })
            .map_err(Into::into)
    }
}

impl FrameSource for Webcam {
    fn next_frame(&mut self) -> anyhow::Result<Image> {
        self.read()
    }

    fn timers(&self) -> Vec<&Timer> {
        vec![&self.t_dequeue, &self.t_decode]
    }
}
