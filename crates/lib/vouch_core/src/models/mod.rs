//! Domain models shared by the stores, the token authority and the API.

pub mod auth;
pub mod client;
