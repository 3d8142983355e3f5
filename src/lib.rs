//! schemavault - per-tenant PostgreSQL schema lifecycle management
//!
//! Each tenant owns one isolated schema. schemavault snapshots that schema
//! with `pg_dump`, restores a snapshot into production or into a parallel
//! `_temp` schema for validation, and promotes a validated temp schema into
//! production with a metadata-only rename swap.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod dump;
pub mod lifecycle;
pub mod observability;
pub mod remote;
pub mod restore;
pub mod scheduler;
pub mod store;
