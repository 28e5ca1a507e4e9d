//! Request handlers, one module per resource.

pub mod auth;
pub mod clients;
pub mod linkedin;
pub mod oauth;
pub mod users;
