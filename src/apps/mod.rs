//! The tracker apps. Each one owns its tables and shares the store, handler,
//! and event plumbing.

pub mod anniversary;
pub mod bills;
pub mod blood_pressure;
pub mod camping;
pub mod fuel;
pub mod real_estate;
pub mod wine;
