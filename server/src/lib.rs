#![cfg_attr(
    test,
    allow(clippy::expect_used, clippy::unwrap_used, clippy::disallowed_methods)
)]
// Life of a request:
// 1. The session middleware turns the `authToken` cookie into an AuthContext
// 2. The handler checks the caller may do what it asks
// 3. Reads go straight to a repository; page writes go through PageService,
//    which keeps pages, page orders and aliases in step
// 4. Repositories validate, convert ids for the active driver and call it
// 5. The result or error is wrapped in the JSON envelope
//
// System components:
//  - Driver: embedded log store or MongoDB
//  - Repositories and the page service
//  - Menu builder
//  - HTTP API

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod menu;
pub mod models;
pub mod server;
pub mod services;

#[cfg(test)]
mod e2e_tests;
