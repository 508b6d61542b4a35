//! Request-independent business logic. Handlers in `controllers` only extract
//! and serialize; everything that decides an outcome lives here.

pub mod booking;
pub mod identity;
