//! Payees, the bills owed to them, and the payments made against each bill.

mod bill;
mod payee;
mod payment;

pub use bill::*;
pub use payee::*;
pub use payment::*;
