//! Birthdays, anniversaries, and the gifts, celebrations, and reminders
//! hanging off them.

mod celebration;
mod gift;
mod important_date;
mod reminder;

pub use celebration::*;
pub use gift::*;
pub use important_date::*;
pub use reminder::*;

use crate::store::Parent;

pub(crate) const IMPORTANT_DATE_PARENT: Parent = Parent {
    column: "important_date_id",
    table: "important_dates",
    id_column: "important_date_id",
    kind: "important_date",
};
