//! Rental and investment properties: expenses, leases, and cash flow.

mod cash_flow;
mod expense;
mod lease;
mod property;

pub use cash_flow::*;
pub use expense::*;
pub use lease::*;
pub use property::*;

use crate::store::Parent;

pub(crate) const PROPERTY_PARENT: Parent = Parent {
    column: "property_id",
    table: "properties",
    id_column: "property_id",
    kind: "property",
};
