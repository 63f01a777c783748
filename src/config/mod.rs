//! Configuration: typed settings and the persistent state store

mod settings;
mod store;

pub use settings::Settings;
pub use store::{Store, StoredState};
