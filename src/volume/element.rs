//! This module defines the sample element API, which maps each NRRD sample
//! type to one of the in-memory cell types (`u8`, `u16` or `f32`) and back.
//!
//! Signed 8 and 16 bit samples are shifted into the unsigned range on read
//! (`+0x80` and `+0x8000`), and shifted back on write. All 32 and 64 bit
//! samples are held as `f32`.
use super::Pixels;
use crate::typedef::SampleType;
use byteordered::{ByteOrdered, Endian};
use num_traits::AsPrimitive;
use std::io::{Read, Result as IoResult, Write};

/// Trait type for the cells of a planar image.
pub trait PlanarElement: 'static + Sized + Copy + Default + PartialOrd + AsPrimitive<f32> + AsPrimitive<f64> {
    /// The sample type written for this cell type when no other is requested.
    const SAMPLE_TYPE: SampleType;

    /// Whether samples of the given type are decoded into this cell type.
    /// Encoding a cell back into a wider type may round it.
    fn holds(sample_type: SampleType) -> bool;

    /// Read a single sample of the given type from the byte source.
    fn read_sample<R, E>(src: R, sample_type: SampleType, e: E) -> IoResult<Self>
    where
        R: Read,
        E: Endian;

    /// Write this cell as a single sample of the given type.
    fn write_sample<W, E>(self, dst: W, sample_type: SampleType, e: E) -> IoResult<()>
    where
        W: Write,
        E: Endian;

    /// Gather the given planes into pixels.
    fn into_pixels(planes: Vec<Vec<Self>>) -> Pixels;

    /// Borrow the planes of pixels holding this cell type.
    fn planes(pixels: &Pixels) -> Option<&[Vec<Self>]>;
}

impl PlanarElement for u8 {
    const SAMPLE_TYPE: SampleType = SampleType::Uint8;

    fn holds(sample_type: SampleType) -> bool {
        sample_type == SampleType::Uint8 || sample_type == SampleType::Int8
    }

    fn read_sample<R, E>(src: R, sample_type: SampleType, _: E) -> IoResult<Self>
    where
        R: Read,
        E: Endian,
    {
        let v = ByteOrdered::native(src).read_u8()?;
        Ok(match sample_type {
            SampleType::Int8 => v.wrapping_add(0x80),
            _ => v,
        })
    }

    fn write_sample<W, E>(self, dst: W, sample_type: SampleType, _: E) -> IoResult<()>
    where
        W: Write,
        E: Endian,
    {
        let v = match sample_type {
            SampleType::Int8 => self.wrapping_sub(0x80),
            _ => self,
        };
        ByteOrdered::native(dst).write_u8(v)
    }

    fn into_pixels(planes: Vec<Vec<Self>>) -> Pixels {
        Pixels::U8(planes)
    }

    fn planes(pixels: &Pixels) -> Option<&[Vec<Self>]> {
        match pixels {
            Pixels::U8(planes) => Some(planes),
            _ => None,
        }
    }
}

impl PlanarElement for u16 {
    const SAMPLE_TYPE: SampleType = SampleType::Uint16;

    fn holds(sample_type: SampleType) -> bool {
        sample_type == SampleType::Uint16 || sample_type == SampleType::Int16
    }

    fn read_sample<R, E>(src: R, sample_type: SampleType, e: E) -> IoResult<Self>
    where
        R: Read,
        E: Endian,
    {
        let v = e.read_u16(src)?;
        Ok(match sample_type {
            SampleType::Int16 => v.wrapping_add(0x8000),
            _ => v,
        })
    }

    fn write_sample<W, E>(self, dst: W, sample_type: SampleType, e: E) -> IoResult<()>
    where
        W: Write,
        E: Endian,
    {
        let v = match sample_type {
            SampleType::Int16 => self.wrapping_sub(0x8000),
            _ => self,
        };
        e.write_u16(dst, v)
    }

    fn into_pixels(planes: Vec<Vec<Self>>) -> Pixels {
        Pixels::U16(planes)
    }

    fn planes(pixels: &Pixels) -> Option<&[Vec<Self>]> {
        match pixels {
            Pixels::U16(planes) => Some(planes),
            _ => None,
        }
    }
}

impl PlanarElement for f32 {
    const SAMPLE_TYPE: SampleType = SampleType::Float32;

    fn holds(sample_type: SampleType) -> bool {
        sample_type.size_of() >= 4
    }

    fn read_sample<R, E>(src: R, sample_type: SampleType, e: E) -> IoResult<Self>
    where
        R: Read,
        E: Endian,
    {
        Ok(match sample_type {
            SampleType::Uint32 => e.read_u32(src)? as f32,
            SampleType::Int32 => e.read_i32(src)? as f32,
            SampleType::Float64 => e.read_f64(src)? as f32,
            _ => e.read_f32(src)?,
        })
    }

    fn write_sample<W, E>(self, dst: W, sample_type: SampleType, e: E) -> IoResult<()>
    where
        W: Write,
        E: Endian,
    {
        match sample_type {
            SampleType::Uint32 => e.write_u32(dst, self as u32),
            SampleType::Int32 => e.write_i32(dst, self as i32),
            SampleType::Float64 => e.write_f64(dst, f64::from(self)),
            _ => e.write_f32(dst, self),
        }
    }

    fn into_pixels(planes: Vec<Vec<Self>>) -> Pixels {
        Pixels::F32(planes)
    }

    fn planes(pixels: &Pixels) -> Option<&[Vec<Self>]> {
        match pixels {
            Pixels::F32(planes) => Some(planes),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteordered::Endianness;

    #[test]
    fn byte_order_of_u16() {
        let mut out = Vec::new();
        300u16
            .write_sample(&mut out, SampleType::Uint16, Endianness::Little)
            .unwrap();
        assert_eq!(out, [0x2C, 0x01]);
        let v = u16::read_sample(&out[..], SampleType::Uint16, Endianness::Little).unwrap();
        assert_eq!(v, 300);

        out.clear();
        300u16
            .write_sample(&mut out, SampleType::Uint16, Endianness::Big)
            .unwrap();
        assert_eq!(out, [0x01, 0x2C]);
    }

    #[test]
    fn signed_samples_are_shifted() {
        let v = u8::read_sample(&[0xFFu8][..], SampleType::Int8, Endianness::Little).unwrap();
        assert_eq!(v, 0x7F);
        let v = u16::read_sample(&[0x00, 0x80][..], SampleType::Int16, Endianness::Little).unwrap();
        assert_eq!(v, 0);

        let mut out = Vec::new();
        0x7Fu8.write_sample(&mut out, SampleType::Int8, Endianness::Little).unwrap();
        0u16.write_sample(&mut out, SampleType::Int16, Endianness::Big).unwrap();
        assert_eq!(out, [0xFF, 0x80, 0x00]);
    }

    #[test]
    fn wide_samples_become_f32() {
        let v = f32::read_sample(&(-7i32).to_be_bytes()[..], SampleType::Int32, Endianness::Big).unwrap();
        assert_eq!(v, -7.);
        let v = f32::read_sample(&2.5f64.to_le_bytes()[..], SampleType::Float64, Endianness::Little).unwrap();
        assert_eq!(v, 2.5);
        assert!(f32::holds(SampleType::Uint32));
        assert!(!f32::holds(SampleType::Int16));

        let mut out = Vec::new();
        1.5f32.write_sample(&mut out, SampleType::Float64, Endianness::Little).unwrap();
        assert_eq!(out, 1.5f64.to_le_bytes());
    }
}
