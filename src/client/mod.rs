//! Typed client for the booking API.
//!
//! [`BookingSession`] holds the state of one seat-selection flow (movie,
//! theatre, show, seats) and [`BookingClient`] talks to the HTTP API.

mod api;
mod session;

pub use api::{token_identity, BookingClient, ClientError};
pub use session::{BookingSession, SessionError};
