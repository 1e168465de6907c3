//! Production HTTP clients for the backend fleet APIs
//!
//! These implement the collaborator traits the adapters depend on, for the
//! backends that speak plain token-authenticated REST. GameLift has no
//! client here: its SDK construction (request signing included) belongs to
//! the embedding host, which injects an implementation of
//! `GameLiftClientFactory`.

pub mod agones;
pub mod multiplay;
pub mod playfab;

pub use agones::HttpAgonesApi;
pub use multiplay::HttpMultiplayApiFactory;
pub use playfab::{HttpPlayFabAuthApi, HttpPlayFabClientFactory};
