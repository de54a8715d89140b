#![deny(clippy::all)]

pub mod auth;
