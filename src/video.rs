use std::path::Path;

use ndarray::prelude::*;
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio,
};

use crate::error::Error;
use crate::frame::{Frame, VideoMeta, VideoSource};

/// Decodes a video file with OpenCV, yielding RGB frames.
pub struct OpencvVideoSource {
    cam: videoio::VideoCapture,
    meta: VideoMeta,
    next_index: u64,
    bgr: Mat,
}

impl OpencvVideoSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let cam = videoio::VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)?;

        if !videoio::VideoCapture::is_opened(&cam)? {
            return Err(Error::VideoOpen {
                path: path.to_path_buf(),
            });
        }

        let meta = VideoMeta {
            width: cam.get(videoio::CAP_PROP_FRAME_WIDTH)?.max(0.0) as u32,
            height: cam.get(videoio::CAP_PROP_FRAME_HEIGHT)?.max(0.0) as u32,
            fps: cam.get(videoio::CAP_PROP_FPS)?,
            frame_count: cam.get(videoio::CAP_PROP_FRAME_COUNT)?.max(0.0) as u64,
        };

        tracing::debug!(?path, ?meta, "video opened");

        Ok(Self {
            cam,
            meta,
            next_index: 0,
            bgr: Mat::default(),
        })
    }
}

impl VideoSource for OpencvVideoSource {
    #[inline]
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Error> {
        if !self.cam.read(&mut self.bgr)? {
            return Ok(None);
        }

        let (width, height) = (self.bgr.cols(), self.bgr.rows());
        if width <= 0 || height <= 0 {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&self.bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        // a freshly converted Mat is continuous; non-8UC3 data fails the shape check
        let image = Array3::from_shape_vec(
            (height as usize, width as usize, 3),
            rgb.data_bytes()?.to_vec(),
        )?;

        let frame = Frame::new(self.next_index, image);
        self.next_index += 1;

        Ok(Some(frame))
    }
}
