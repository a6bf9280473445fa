//! Persistence layer: store traits, PostgreSQL repositories and an in-memory store.

pub mod db;

pub use db::*;
