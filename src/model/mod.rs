//! # Lineage Model
//!
//! Clean DTOs shared by the store, the track-table transcoder and the
//! point-cloud surfaces.
//!
//! Design rule: this module is pure data. No I/O, no locks, no logging.

pub mod spot;
pub mod link;
pub mod track;
pub mod window;

pub use spot::{Spot, SpotId, Shape};
pub use link::{Link, LinkId, Direction};
pub use track::{TrackId, TrackSegment};
pub use window::TimeWindow;
