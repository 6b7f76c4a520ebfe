//! Enumeration of the files written for an image split along some axes.
//!
//! Each axis flagged with `slice` is walked from index 0 to its size,
//! the last sliced axis varying fastest. Every combination of indices makes
//! one task: a header describing that slice, the file name to write it to,
//! and the region of the image it covers.
use crate::axis::AxisRole;
use crate::header::{data_file_name, NrrdHeader};
use crate::typedef::Encoding;
use crate::volume::SliceRegion;
use std::iter::FusedIterator;

/// Format the file name of the slice described by the header.
///
/// For every sliced axis, in axis order, `_<letter><index>` is inserted
/// before the extension of `base`, with the index zero-padded to the
/// number of digits of the axis size. Without an extension, `.nhdr` or
/// `.nrrd` is appended depending on whether the header is detached.
pub fn slice_file_name(base: &str, header: &NrrdHeader) -> String {
    let (name, extension) = match base.rfind('.') {
        Some(i) => (&base[..i], &base[i..]),
        None => (base, if header.detached { ".nhdr" } else { ".nrrd" }),
    };
    let mut out = name.to_string();
    for axis in header.axes.iter().filter(|a| a.slice) {
        let letter = axis.role.map(AxisRole::letter).unwrap_or('A');
        out.push_str(&format!(
            "_{}{:0width$}",
            letter,
            axis.slice_index,
            width = axis.index_digits()
        ));
    }
    out.push_str(extension);
    out
}

/// One file of a sliced image.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceTask {
    /// The header of this slice, with the slice indices set.
    ///
    /// It still describes the whole image: the sliced axes keep their
    /// sizes and their `slice` flag, so that `region` can be taken from
    /// it. They are masked out when the header is written with
    /// [`NrrdHeader::to_text`] or [`NrrdHeader::write_header`].
    ///
    /// [`NrrdHeader::to_text`]: ../header/struct.NrrdHeader.html#method.to_text
    /// [`NrrdHeader::write_header`]: ../header/struct.NrrdHeader.html#method.write_header
    pub header: NrrdHeader,
    /// The name of the file to write the header to.
    pub file_name: String,
    /// The part of the image this slice covers.
    pub region: SliceRegion,
}

/// A lazy iterator over the slices of an image.
///
/// Created with [`NrrdHeader::slices`].
///
/// [`NrrdHeader::slices`]: ../header/struct.NrrdHeader.html#method.slices
#[derive(Debug, Clone)]
pub struct SliceTasks {
    header: NrrdHeader,
    base_name: String,
    sliced: Vec<usize>,
    remaining: usize,
}

impl SliceTasks {
    fn new(header: &NrrdHeader, base_name: &str) -> Self {
        let mut header = header.clone();
        for axis in header.axes.iter_mut() {
            axis.slice_index = 0;
        }
        let sliced: Vec<usize> = (0..header.axes.len())
            .filter(|i| header.axes[*i].slice)
            .collect();
        let remaining = sliced.iter().map(|i| header.axes[*i].size).product();
        SliceTasks {
            header,
            base_name: base_name.to_string(),
            sliced,
            remaining,
        }
    }

    fn task(&self) -> SliceTask {
        let mut header = self.header.clone();
        let file_name = slice_file_name(&self.base_name, &header);
        if header.detached {
            header.data_file = Some(data_file_name(
                &file_name,
                header.encoding.unwrap_or(Encoding::Raw),
            ));
        }
        let region = SliceRegion::from_header(&header);
        SliceTask {
            header,
            file_name,
            region,
        }
    }

    fn advance(&mut self) {
        for &i in self.sliced.iter().rev() {
            let axis = &mut self.header.axes[i];
            axis.slice_index += 1;
            if axis.slice_index < axis.size {
                return;
            }
            axis.slice_index = 0;
        }
    }
}

impl Iterator for SliceTasks {
    type Item = SliceTask;

    fn next(&mut self) -> Option<SliceTask> {
        if self.remaining == 0 {
            return None;
        }
        let task = self.task();
        self.remaining -= 1;
        self.advance();
        Some(task)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SliceTasks {}

impl FusedIterator for SliceTasks {}

impl NrrdHeader {
    /// Enumerate the files to write for this header, split along every
    /// axis flagged with `slice`. Without sliced axes, there is a single
    /// task covering the whole image.
    pub fn slices(&self, base_name: &str) -> SliceTasks {
        SliceTasks::new(self, base_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typedef::SampleType;
    use pretty_assertions::assert_eq;

    fn volume(sizes: &[usize]) -> NrrdHeader {
        let mut header = NrrdHeader::new(sizes, SampleType::Uint8).unwrap();
        for axis in header.axes.iter_mut() {
            axis.kind = Some("space".to_string());
        }
        header.resolve();
        header
    }

    #[test]
    fn slice_names() {
        let mut header = volume(&[4, 4, 12]);
        header.axes[2].slice = true;
        let names: Vec<String> = header.slices("scan.nrrd").map(|t| t.file_name).collect();
        assert_eq!(names.len(), 12);
        assert_eq!(names[0], "scan_Z00.nrrd");
        assert_eq!(names[11], "scan_Z11.nrrd");

        header.detached = true;
        let task = header.slices("scan").nth(3).unwrap();
        assert_eq!(task.file_name, "scan_Z03.nhdr");
        assert_eq!(task.header.data_file.as_deref(), Some("scan_Z03.raw"));
    }

    #[test]
    fn slice_headers_lose_the_axis() {
        let mut header = volume(&[4, 4, 12]);
        header.axes[2].slice = true;
        for (i, task) in header.slices("scan.nrrd").enumerate() {
            let text = task.header.to_text().unwrap();
            assert!(text.contains("dimension: 2\nsizes: 4 4\n"));
            assert!(text.contains(&format!("z index:={}\nn zs:=12\n", i)));
            assert_eq!((task.region.z0, task.region.z1), (i, i + 1));
        }
    }

    #[test]
    fn slice_header_model_keeps_the_axis() {
        let mut header = volume(&[4, 4, 12]);
        header.axes[2].slice = true;
        let task = header.slices("scan.nrrd").nth(5).unwrap();
        assert_eq!(task.header.axes.len(), 3);
        assert_eq!(task.header.n_slices(), 12);
        assert!(task.header.axes[2].slice);
        assert_eq!(task.header.axes[2].slice_index, 5);

        let written = NrrdHeader::from_bytes(task.header.to_text().unwrap().as_bytes()).unwrap();
        assert_eq!(written.axes.len(), 2);
        assert_eq!(written.n_slices(), 1);
        assert_eq!(written.custom_fields.get("z index"), Some("5"));
    }

    #[test]
    fn last_sliced_axis_is_fastest() {
        let mut header = volume(&[2, 3, 2]);
        header.axes[1].slice = true;
        header.axes[2].slice = true;
        let tasks = header.slices("a.nrrd");
        assert_eq!(tasks.len(), 6);
        let names: Vec<String> = tasks.map(|t| t.file_name).collect();
        assert_eq!(
            names,
            vec![
                "a_Y0_Z0.nrrd",
                "a_Y0_Z1.nrrd",
                "a_Y1_Z0.nrrd",
                "a_Y1_Z1.nrrd",
                "a_Y2_Z0.nrrd",
                "a_Y2_Z1.nrrd",
            ]
        );
    }

    #[test]
    fn no_sliced_axis() {
        let header = volume(&[2, 2]);
        let tasks: Vec<SliceTask> = header.slices("b.nrrd").collect();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].file_name, "b.nrrd");
        assert_eq!(tasks[0].region, SliceRegion::full(&header.image_shape()));
    }
}
