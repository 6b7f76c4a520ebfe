//! Per-axis metadata of a NRRD image.
use crate::typedef::Center;

/// The role an axis plays in a planar image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisRole {
    /// Interleaved channels.
    Channel,
    /// Image columns.
    X,
    /// Image rows.
    Y,
    /// Stack slices.
    Z,
    /// Time frames.
    Time,
}

impl AxisRole {
    /// All roles, in canonical axis order.
    pub const ALL: [AxisRole; 5] = [
        AxisRole::Channel,
        AxisRole::X,
        AxisRole::Y,
        AxisRole::Z,
        AxisRole::Time,
    ];

    /// Lower case name, used in slice bookkeeping fields.
    pub fn name(self) -> &'static str {
        match self {
            AxisRole::Channel => "channel",
            AxisRole::X => "x",
            AxisRole::Y => "y",
            AxisRole::Z => "z",
            AxisRole::Time => "time",
        }
    }

    /// Upper case letter, used in slice file names.
    pub fn letter(self) -> char {
        match self {
            AxisRole::Channel => 'C',
            AxisRole::X => 'X',
            AxisRole::Y => 'Y',
            AxisRole::Z => 'Z',
            AxisRole::Time => 'T',
        }
    }

    /// The axis kind assigned to this role when exporting an image.
    pub fn default_kind(self) -> Option<&'static str> {
        match self {
            AxisRole::Channel => None,
            AxisRole::X | AxisRole::Y | AxisRole::Z => Some("space"),
            AxisRole::Time => Some("time"),
        }
    }
}

/// Metadata of a single NRRD axis. Unset reals are NaN.
#[derive(Debug, Clone)]
pub struct NrrdAxis {
    /// Number of samples along this axis.
    pub size: usize,
    /// Sample spacing.
    pub spacing: f64,
    /// Sample thickness.
    pub thickness: f64,
    /// Sample centering.
    pub center: Center,
    /// Position of the first sample.
    pub min: f64,
    /// Position of the last sample.
    pub max: f64,
    /// Unit of `spacing`, `min` and `max`.
    pub unit: Option<String>,
    /// Free-form label.
    pub label: Option<String>,
    /// Axis kind, such as `space` or `rgb-color`.
    pub kind: Option<String>,
    /// Role resolved from the axis layout.
    pub role: Option<AxisRole>,
    /// Whether this axis is split into separate files on write.
    pub slice: bool,
    /// Index along this axis of the slice being written.
    pub slice_index: usize,
}

impl Default for NrrdAxis {
    fn default() -> Self {
        NrrdAxis {
            size: 0,
            spacing: std::f64::NAN,
            thickness: std::f64::NAN,
            center: Center::Unknown,
            min: std::f64::NAN,
            max: std::f64::NAN,
            unit: None,
            label: None,
            kind: None,
            role: None,
            slice: false,
            slice_index: 0,
        }
    }
}

fn same_real(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Axes compare equal when their fields match, where NaN equals NaN.
impl PartialEq for NrrdAxis {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size
            && same_real(self.spacing, other.spacing)
            && same_real(self.thickness, other.thickness)
            && self.center == other.center
            && same_real(self.min, other.min)
            && same_real(self.max, other.max)
            && self.unit == other.unit
            && self.label == other.label
            && self.kind == other.kind
            && self.role == other.role
            && self.slice == other.slice
            && self.slice_index == other.slice_index
    }
}

impl NrrdAxis {
    /// Create an axis with the given size and no further metadata.
    pub fn new(size: usize) -> Self {
        NrrdAxis {
            size,
            ..Default::default()
        }
    }

    /// Create an axis for the given role, with its default kind.
    pub fn with_role(role: AxisRole) -> Self {
        NrrdAxis {
            role: Some(role),
            kind: role.default_kind().map(str::to_string),
            ..Default::default()
        }
    }

    /// Whether the kind of this axis, if any, allows it to hold channels.
    pub fn is_channel_like(&self) -> bool {
        match &self.kind {
            None => true,
            Some(k) => {
                let k = k.to_lowercase();
                k != "domain" && k != "space" && k != "time"
            }
        }
    }

    /// Whether the kind of this axis is `time`.
    pub fn is_time(&self) -> bool {
        self.kind
            .as_ref()
            .map(|k| k.eq_ignore_ascii_case("time"))
            .unwrap_or(false)
    }

    /// Number of decimal digits needed to print any index along this axis.
    pub fn index_digits(&self) -> usize {
        let mut n = self.size;
        let mut digits = 1;
        while n >= 10 {
            n /= 10;
            digits += 1;
        }
        digits
    }
}
