//! Presentation-facing helpers built on top of the core timeline.
//!
//! Nothing in `core` depends on this module.

pub mod grouping;

pub use grouping::{
    DEFAULT_GROUP_THRESHOLD_PERCENT, GroupSelection, TimelineGroup, cycle, group_by_position,
};
