// src/store/mod.rs — Persistence layer (SQLite)

pub mod schema;
pub mod store;
pub mod store_server;

pub use store::Store;
pub use store_server::{spawn_store_server, StoreHandle};
