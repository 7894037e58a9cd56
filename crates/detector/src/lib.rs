//! HTTP front end for the sensor anomaly detector
//!
//! Exposes batch scoring over `POST /v1/detect` next to the usual health
//! and Prometheus endpoints.

pub mod api;
pub mod config;
