//! Camping trip planner: campsites, trips, gear checklists, and reviews.

mod campsite;
mod gear_checklist;
mod review;
mod trip;

pub use campsite::*;
pub use gear_checklist::*;
pub use review::*;
pub use trip::*;

use crate::store::Parent;

pub(crate) const CAMPSITE_PARENT: Parent = Parent {
    column: "campsite_id",
    table: "campsites",
    id_column: "campsite_id",
    kind: "campsite",
};

pub(crate) const CAMPING_TRIP_PARENT: Parent = Parent {
    column: "trip_id",
    table: "camping_trips",
    id_column: "trip_id",
    kind: "camping_trip",
};
