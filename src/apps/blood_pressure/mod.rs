//! Blood pressure readings, classified by AHA category, and trends over time.

mod reading;
mod trend;

pub use reading::*;
pub use trend::*;
