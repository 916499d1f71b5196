//! Gap-fill estimation of active and inactive time
//!
//! This module provides:
//! - Forward-hold reconstruction of a status timeline from sparse polls
//! - Boundary extrapolation to the window edges
//! - Integration of the timeline over the full window or selected spans

mod gap_fill;
mod timeline;

pub use gap_fill::{estimate, Estimate};
pub use timeline::{merge_spans, Span, Timeline};
