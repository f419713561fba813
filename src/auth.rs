//! Auth-domain token models and wire DTOs.

pub mod dto;
pub mod pair;
pub mod secret;

pub use dto::*;
pub use pair::*;
pub use secret::*;
