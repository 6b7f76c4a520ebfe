//! An application for writing a NRRD file from scratch

use nrrd::{AxisRole, Calibration, Encoding, ImageShape, Pixels, PlanarImage, WriterOptions};
use std::env;

fn main() {
    let mut args = env::args().skip(1);
    let filename = args.next().expect("Path to NRRD file is required");
    let sliced = args.next().map(|a| a == "--slices").unwrap_or(false);

    // generate a 64x64 float32 gradient over 4 slices
    let shape = ImageShape {
        slices: 4,
        ..ImageShape::new(64, 64)
    };
    let planes = (0..shape.slices)
        .map(|z| {
            (0..shape.plane_len())
                .map(|p| (p % 64 + p / 64 + 16 * z) as f32)
                .collect()
        })
        .collect();
    let image = PlanarImage::new(shape, Pixels::F32(planes)).expect("Invalid image");

    let cal = Calibration {
        pixel_width: 0.5,
        pixel_height: 0.5,
        pixel_depth: 2.,
        x_unit: Some("mm".to_string()),
        y_unit: Some("mm".to_string()),
        z_unit: Some("mm".to_string()),
        ..Calibration::default()
    };

    let mut options = WriterOptions::new(&filename)
        .calibration(&cal)
        .encoding(Encoding::Gzip);
    if sliced {
        options = options.slice_along(AxisRole::Z);
    }
    options.write(&image).expect("Failed to write NRRD file");
}
