//! Rust implementation of the NRRD (Nearly Raw Raster Data) file format.
//!
//! A NRRD file holds a text header describing an n-dimensional raster,
//! followed by the samples themselves (attached) or pointing to a separate
//! data file (detached). This crate reads and writes such files as planar
//! images of up to five dimensions: channel, x, y, slice and frame.
//!
//! # Example
//!
//! ```no_run
//! use nrrd::{NrrdObject, WriterOptions};
//!
//! let obj = NrrdObject::from_file("scan.nrrd")?;
//! println!("{} images", obj.header().n_images());
//! WriterOptions::new("copy.nhdr")
//!     .reference_header(obj.header())
//!     .write(obj.image())?;
//! # Ok::<(), nrrd::NrrdError>(())
//! ```
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

#[macro_use]
extern crate quick_error;

pub mod axis;
pub mod calibration;
pub mod error;
pub mod grammar;
pub mod header;
pub mod object;
pub mod shape;
pub mod slice;
pub mod typedef;
pub mod volume;
pub mod writer;
mod util;

pub use crate::axis::{AxisRole, NrrdAxis};
pub use crate::calibration::Calibration;
pub use crate::error::{NrrdError, Result};
pub use crate::header::{CustomFields, HeaderParser, NrrdHeader};
pub use crate::object::{NrrdObject, ReaderOptions, StreamedNrrdObject};
pub use crate::slice::{SliceTask, SliceTasks};
pub use crate::typedef::{Center, Encoding, SampleType};
pub use crate::volume::{
    decode_image, encode_image, DecodeReport, ImageEncoder, ImageShape, Pixels, PlanarImage,
    SliceRegion, StreamedNrrdVolume,
};
pub use crate::writer::{Overwrite, OverwritePolicy, SliceOutcome, WriterOptions};
pub use byteordered::Endianness;
