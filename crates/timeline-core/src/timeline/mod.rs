//! Date-ranged timeline layout: window resolution, header columns, bar
//! positions and lane packing.

pub mod granularity;
pub mod header;
pub mod lanes;
pub mod layout;
pub mod position;
pub mod window;

pub use granularity::Granularity;
pub use header::{Column, generate_headers};
pub use lanes::{LaneAssignment, assign_lanes};
pub use layout::{Bar, TimelineLayout, WindowOverride, build_layout};
pub use position::{BarPosition, position_for};
pub use window::{Window, resolve_window};
