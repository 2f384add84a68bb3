//! Token refresh gate for outgoing API requests
//!
//! Every request passes through `RefreshGate::authorize` before it is sent.
//! The gate attaches the live bearer token, refreshes an expired one at most
//! once no matter how many requests notice at the same time, and ends the
//! session (clear storage, redirect to login) when no valid credential can be
//! had.
//!
//! Request lifecycle:
//! 1. Strip the `isPublic` marker from the query string
//! 2. No token: public requests go out bare, others end the session
//! 3. Live token: attach it and go
//! 4. Expired token with a live refresh token: lead or join the single
//!    refresh flight, then attach the new token
//! 5. Anything else ends the session

pub mod clock;
pub mod error;
pub mod gate;
pub mod metrics;
pub mod session;
pub mod singleflight;

pub use clock::{Clock, SystemClock};
pub use error::{GateError, Result};
pub use gate::RefreshGate;
pub use session::{LoginRedirect, Routes, SessionSink};
pub use singleflight::{FlightError, Role, SingleFlight};
