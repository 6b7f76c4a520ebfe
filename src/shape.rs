//! Resolution of axis roles from the axis layout of a header.
//!
//! The first axis varies fastest on disk. With up to five axes, the roles
//! are picked as follows, where channel-like means that the first axis kind
//! is absent or not one of `domain`, `space` or `time`:
//!
//! | axes | layout |
//! |------|--------|
//! | 1 | X |
//! | 2 | XY |
//! | 3 | CXY if channel-like and the last kind is not `time`, XYT if not channel-like and the last kind is `time`, else XYZ. A space dimension of 3 always means XYZ |
//! | 4 | CXYT or CXYZ (by the last kind) if channel-like and the space dimension is not 4, else XYZT |
//! | 5 | CXYZT |

use crate::axis::{AxisRole, NrrdAxis};
use crate::header::{AxisIndices, SpaceIndices};

/// Decide which axis holds each role, and record the role in each axis.
pub fn resolve_shape(axes: &mut [NrrdAxis], space_dim: usize) -> AxisIndices {
    use self::AxisRole::*;
    let layout: &[AxisRole] = match axes.len() {
        1 => &[X],
        2 => &[X, Y],
        3 => {
            let channel_first = axes[0].is_channel_like();
            let time_last = axes[2].is_time();
            if space_dim != 3 && channel_first && !time_last {
                &[Channel, X, Y]
            } else if space_dim != 3 && !channel_first && time_last {
                &[X, Y, Time]
            } else {
                &[X, Y, Z]
            }
        }
        4 => {
            if space_dim != 4 && axes[0].is_channel_like() {
                if axes[3].is_time() {
                    &[Channel, X, Y, Time]
                } else {
                    &[Channel, X, Y, Z]
                }
            } else {
                &[X, Y, Z, Time]
            }
        }
        5 => &[Channel, X, Y, Z, Time],
        _ => &[],
    };

    let mut indices = AxisIndices::default();
    for axis in axes.iter_mut() {
        axis.role = None;
    }
    for (i, role) in layout.iter().enumerate() {
        axes[i].role = Some(*role);
        let slot = match role {
            Channel => &mut indices.channel,
            X => &mut indices.x,
            Y => &mut indices.y,
            Z => &mut indices.z,
            Time => &mut indices.time,
        };
        *slot = Some(i);
    }
    indices
}

/// Derive the space vector index of each spatial role.
///
/// Space is always ordered X, Y, Z, T with absent roles skipped: X is 0,
/// Y is 1 when present, and Z and T sit at their axis offset from X.
pub fn solve_space_indices(indices: &AxisIndices) -> SpaceIndices {
    let x = indices.x.unwrap_or(0);
    SpaceIndices {
        x: Some(0),
        y: indices.y.map(|_| 1),
        z: indices.z.map(|z| z - x),
        time: indices.time.map(|t| t - x),
    }
}
