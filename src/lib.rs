//! Client core of a community member directory: typed access to the
//! directory backend, a normalized local store, search/filter/sort/group
//! projections, debounced search that follows the location, and admin
//! approval reconciliation.

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod projection;
pub mod query;
pub mod service;
pub mod store;
