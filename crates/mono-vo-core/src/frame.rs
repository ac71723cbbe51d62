//! Small helpers over the `calib-targets-core` gray image types.

use calib_targets_core::{GrayImage, GrayImageView};

/// Borrow an owned frame.
pub fn frame_view(img: &GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width,
        height: img.height,
        data: &img.data,
    }
}

/// A `width x height` frame filled with `value`.
pub fn blank_frame(width: usize, height: usize, value: u8) -> GrayImage {
    GrayImage {
        width,
        height,
        data: vec![value; width * height],
    }
}

/// Pixel at `(x, y)`, or `None` outside the frame.
pub fn pixel(view: &GrayImageView<'_>, x: usize, y: usize) -> Option<u8> {
    if x >= view.width || y >= view.height {
        return None;
    }
    view.data.get(y * view.width + x).copied()
}
