pub mod clock;
pub mod config;
pub mod geo;
pub mod validation;
