use std::path::{Path, PathBuf};

use crate::session::domain::frame_source::{FrameSource, FrameSourceError};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Frame source over the image files of a directory, in sorted filename
/// order.
///
/// The local-capture equivalent for deployments without a camera: a
/// capture device would implement the same port. One unreadable file is a
/// transient acquisition error; the session skips it and moves on.
pub struct ImageDirSource {
    paths: Vec<PathBuf>,
    cursor: usize,
    next_index: usize,
    closed: bool,
}

impl ImageDirSource {
    pub fn open(dir: &Path) -> std::io::Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        paths.sort();

        Ok(Self {
            paths,
            cursor: 0,
            next_index: 0,
            closed: false,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        if self.closed || self.cursor >= self.paths.len() {
            return Ok(None);
        }

        let path = self.paths[self.cursor].clone();
        self.cursor += 1;

        let img = image::open(&path)
            .map_err(|e| FrameSourceError::Acquisition(format!("{}: {e}", path.display())))?
            .to_rgb8();
        let (width, height) = img.dimensions();
        let frame = Frame::new(img.into_raw(), width, height, self.next_index);
        self.next_index += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        log::debug!("image frame source released");
    }
}
