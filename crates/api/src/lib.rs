//! HTTP surface: device registration, team favourites and the broadcast trigger.

pub mod routes;
pub mod state;
