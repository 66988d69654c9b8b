// SPDX-License-Identifier: MIT

//! Tourney-Hub: gaming-tournament registration backend
//!
//! This crate provides the API for browsing tournaments, requesting manual
//! payment approval, team-slot registration and admin results management.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
}
