//! FOI Case Tracker Library
//!
//! Tracks Freedom of Information requests (cases) through assessment, outcome,
//! internal review and external appeal, and keeps a reference list of Members
//! of Parliament.
//!
//! # Modules
//!
//! - `auth`: Acting user resolved from the identity proxy headers.
//! - `case_records_handler`: Screens for one-per-case records.
//! - `choices`: Closed choice enumerations.
//! - `config`: Configuration management.
//! - `db`: Database connection and schema bootstrap.
//! - `db_storage`: Record factories and queries.
//! - `errors`: Error handling types.
//! - `forms`: Submitted forms and field cleaning.
//! - `handlers`: Application state, health, case and comment screens.
//! - `models`: Core data models.
//! - `mp_handler`: MP screens.
//! - `routes`: Router assembly.

pub mod auth;
pub mod case_records_handler;
pub mod choices;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod forms;
pub mod handlers;
pub mod models;
pub mod mp_handler;
pub mod routes;
