//! `SQLite` storage backend.
//!
//! Enable the `sqlx_sqlite` feature to use it. Run [`migrations::run`] once
//! against the pool before building a [`SqliteTeamStore`].

pub mod migrations;
mod store;
mod teams;

pub use store::SqliteTeamStore;
