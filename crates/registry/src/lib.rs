//! Device registrations and team preference filtering.

pub mod filter;
pub mod store;

pub use filter::TeamFilter;
pub use store::RegistrationStore;
