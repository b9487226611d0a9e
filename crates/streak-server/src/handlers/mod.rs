//! Route handlers, one module per resource.

pub mod interactions;
pub mod rewards;
pub mod settings;
pub mod status;
pub mod users;
