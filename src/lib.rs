//! This crate provides the analytics server behind a travel-market dashboard. Analysts describe
//! what they are looking at (a market, origin and destination patterns, a period) and the server
//! keeps six analyses in step with that filter: fare searches over time by search date and by
//! travel date, monthly air traffic, month over month search variations, advance purchase and
//! trip duration histograms.
//!
//! Each analysis is driven by a [controller::QueryController]. A filter change recomputes which
//! analyses have a new query, fetches only those from the travel data
//! [repository](repository::Repository), and discards results that a later change has made stale.
//! Fetched records are turned into [chart descriptions](charts) and `;` separated
//! [exports](export).
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team, on top of the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON request and response data.
//! * [reqwest] fetches records from the REST repository.
//! * [validator] checks filters and request data.

pub mod analysis;
pub mod app;
pub mod app_state;
pub mod charts;
pub mod cli;
pub mod controller;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod filter;
pub mod metrics;
pub mod models;
pub mod pattern;
pub mod patterns;
pub mod repository;
pub mod server;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod transform;
pub mod validated_json;
