//! Wine cellar inventory: bottles, tasting notes, and drinking windows.

mod drinking_window;
mod tasting_note;
mod wine;

pub use drinking_window::*;
pub use tasting_note::*;
pub use wine::*;

use crate::store::Parent;

pub(crate) const WINE_PARENT: Parent = Parent {
    column: "wine_id",
    table: "wines",
    id_column: "wine_id",
    kind: "wine",
};
