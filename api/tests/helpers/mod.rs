#![allow(dead_code)]

pub mod app;
pub mod form;

pub use app::{TestApp, make_test_app};
pub use form::Form;
