//! Budget tracking REST backend.
//!
//! Users register and log in (PBKDF2 password hashes, HS256 bearer tokens),
//! record dated expense entries against a budget limit, read spend-vs-budget
//! series bucketed by day or month, and get a notification for every entry
//! they create, edit or delete.
//!
//! Everything is served by [`backend::build_router`] over a SQLite pool from
//! [`database::db::connection::get_db_pool`].

pub mod backend;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
