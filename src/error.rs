//! Types for error handling go here.
use crate::typedef::SampleType;
use std::io::Error as IOError;
use std::path::PathBuf;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    #[non_exhaustive]
    pub enum NrrdError {
        /// The first line is not a `NRRD` magic line with a four digit version.
        BadMagic(line: String) {
            display("Not a NRRD file: bad magic line {:?}", line)
        }
        /// A header field was given more than once.
        DuplicateField(field: String) {
            display("Duplicate NRRD header field `{}`", field)
        }
        /// A standard header field is not known.
        UnknownField(field: String) {
            display("Unknown NRRD header field `{}`", field)
        }
        /// A mandatory header field is missing or holds an invalid value.
        MissingMandatoryField(field: &'static str) {
            display("Mandatory NRRD header field `{}` is missing or invalid", field)
        }
        /// A field was given before the field it depends on.
        MissingPrerequisite(field: &'static str, prerequisite: &'static str) {
            display("Field `{}` must be preceded by field `{}`", field, prerequisite)
        }
        /// Two mutually exclusive fields were both given.
        ExclusiveFields(first: &'static str, second: &'static str) {
            display("Fields `{}` and `{}` are mutually exclusive", first, second)
        }
        /// A per-axis or per-space-dimension field has the wrong number of entries.
        FieldCountMismatch { field: &'static str, expected: usize, found: usize } {
            display("Field `{}` expects {} values, found {}", field, expected, found)
        }
        /// An axis kind requires a different axis size.
        KindSizeMismatch { kind: String, expected: usize, found: usize } {
            display("Axis kind `{}` requires size {}, found {}", kind, expected, found)
        }
        /// A numeric token could not be parsed.
        MalformedNumber(token: String) {
            display("Malformed number `{}`", token)
        }
        /// A token does not name any value of an enumerated field.
        UnrecognizedEnumValue(field: &'static str, value: String) {
            display("Unrecognized value `{}` for field `{}`", value, field)
        }
        /// A recognized but unsupported feature, such as bzip2 encoding.
        UnsupportedFeature(feature: String) {
            display("Unsupported NRRD feature: {}", feature)
        }
        /// A field value is out of its valid range.
        InvalidField(field: &'static str, reason: String) {
            display("Invalid value for field `{}`: {}", field, reason)
        }
        /// The pixel data holds samples which cannot be written in NRRD form.
        UnsupportedSampleKind(kind: &'static str) {
            display("Unsupported sample kind `{}`", kind)
        }
        /// The pixel data does not match the sample type of the header.
        IncompatiblePixels(expected: SampleType, found: &'static str) {
            display("Pixels of kind `{}` cannot hold samples of type `{}`", found, expected.name())
        }
        /// The number of planes or pixels does not match the image shape.
        PixelCountMismatch { expected: usize, found: usize } {
            display("Expected {} pixel values, found {}", expected, found)
        }
        /// The stream ended before the data could be located.
        UnexpectedEndOfStream {
            display("Unexpected end of stream")
        }
        /// The data file referenced by a detached header could not be found.
        MissingDataFile(path: PathBuf) {
            display("Data file {} not found", path.display())
        }
        /// An error tied to a specific header line.
        AtLine { line: usize, source: Box<NrrdError> } {
            display("line {}: {}", line, source)
            source(source)
        }
        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
            display("{}", err)
        }
    }
}

impl NrrdError {
    /// Attach a header line number to this error.
    pub fn at_line(self, line: usize) -> NrrdError {
        match self {
            e @ NrrdError::AtLine { .. } => e,
            e => NrrdError::AtLine {
                line,
                source: Box::new(e),
            },
        }
    }

    /// The header line number this error is attributed to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            NrrdError::AtLine { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// The underlying error, without line information.
    pub fn root(&self) -> &NrrdError {
        match self {
            NrrdError::AtLine { source, .. } => source.root(),
            e => e,
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, NrrdError>;
