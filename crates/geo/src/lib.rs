//! Client for the georef reverse-geocoding API.

mod client;

pub use client::{GeoClient, GeoError, GeoLocation};
