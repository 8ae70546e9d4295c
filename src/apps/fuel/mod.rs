//! Vehicles with their fill-ups, trips, and fuel efficiency reports.

mod efficiency_report;
mod fill_up;
mod trip;
mod vehicle;

pub use efficiency_report::*;
pub use fill_up::*;
pub use trip::*;
pub use vehicle::*;

use crate::store::Parent;

pub(crate) const VEHICLE_PARENT: Parent = Parent {
    column: "vehicle_id",
    table: "vehicles",
    id_column: "vehicle_id",
    kind: "vehicle",
};
