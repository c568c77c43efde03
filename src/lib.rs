#![deny(clippy::all, clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::unused_async
)]

pub mod app;
pub mod captcha_client;
pub mod config;
pub mod domain;
pub mod email_client;
pub mod notifications;
pub mod routes;
pub mod store;
pub mod telemetry;
