pub mod config;
pub mod controller;
pub mod dpad;
pub mod engine;
pub mod persistence;
