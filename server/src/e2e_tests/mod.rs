//! End-to-end tests through the repositories, the page service and the
//! HTTP router.
//!
//! Each test file covers a specific scenario against a fresh embedded store
//! in a temporary directory.

#![cfg(test)]

mod helpers;

mod test_http_api;
mod test_http_auth;
mod test_id_equality;
mod test_menu;
mod test_page_lifecycle;
mod test_persistence;
