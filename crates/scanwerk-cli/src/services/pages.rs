// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Writing delivered frames to image files.
//
// Raw frames are wrapped in a `Raster` and encoded as PNG; JPEG frames are
// already a complete file and are written as they came.

use std::path::{Path, PathBuf};

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{FrameFormat, Side};
use scanwerk_image::{PixelLayout, Raster};
use scanwerk_session::FrameParams;
use tracing::debug;

/// File name for one side of one sheet, e.g. `page-003-back.png`.
pub fn file_name(sheet: u32, side: Side, format: FrameFormat) -> String {
    let side = match side {
        Side::Front => "front",
        Side::Back => "back",
    };
    let ext = match format {
        FrameFormat::Jpeg => "jpg",
        FrameFormat::Gray | FrameFormat::Rgb => "png",
    };
    format!("page-{sheet:03}-{side}.{ext}")
}

fn layout(frame: &FrameParams) -> PixelLayout {
    match (frame.format, frame.depth) {
        (FrameFormat::Rgb, _) => PixelLayout::Rgb,
        (_, 1) => PixelLayout::Binary,
        _ => PixelLayout::Gray,
    }
}

/// Write one frame into `dir` under `name`.
pub fn write_frame(dir: &Path, name: &str, frame: &FrameParams, data: Vec<u8>) -> Result<PathBuf> {
    let path = dir.join(name);
    if frame.format == FrameFormat::Jpeg {
        std::fs::write(&path, &data)?;
    } else {
        let raster = Raster::from_bytes(
            layout(frame),
            frame.width,
            frame.height,
            frame.bytes_per_line,
            data,
        )?;
        raster
            .to_dynamic()?
            .save(&path)
            .map_err(|e| ScanwerkError::Image(format!("{}: {e}", path.display())))?;
    }
    debug!(path = %path.display(), width = frame.width, height = frame.height, "frame written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(format: FrameFormat, depth: usize, width: usize, bpl: usize) -> FrameParams {
        FrameParams {
            format,
            last_frame: true,
            width,
            height: 2,
            bytes_per_line: bpl,
            depth,
        }
    }

    #[test]
    fn names_carry_sheet_side_and_type() {
        assert_eq!(file_name(3, Side::Back, FrameFormat::Gray), "page-003-back.png");
        assert_eq!(file_name(12, Side::Front, FrameFormat::Jpeg), "page-012-front.jpg");
    }

    #[test]
    fn binary_frame_becomes_black_and_white_png() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let f = frame(FrameFormat::Gray, 1, 8, 1);
        let path = write_frame(tmp.path(), "bits.png", &f, vec![0xf0, 0x0f]).expect("write");
        let img = image::open(&path).expect("open").to_luma8();
        assert_eq!(img.dimensions(), (8, 2));
        assert_eq!(img.get_pixel(0, 0).0, [0]);
        assert_eq!(img.get_pixel(7, 0).0, [255]);
        assert_eq!(img.get_pixel(7, 1).0, [0]);
    }

    #[test]
    fn color_frame_keeps_samples() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let f = frame(FrameFormat::Rgb, 8, 1, 3);
        let path = write_frame(tmp.path(), "rgb.png", &f, vec![1, 2, 3, 4, 5, 6]).expect("write");
        let img = image::open(&path).expect("open").to_rgb8();
        assert_eq!(img.get_pixel(0, 1).0, [4, 5, 6]);
    }

    #[test]
    fn short_frame_is_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let f = frame(FrameFormat::Gray, 8, 4, 4);
        assert!(write_frame(tmp.path(), "short.png", &f, vec![0; 5]).is_err());
    }
}
