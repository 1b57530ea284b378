//! Common utilities.

pub mod mjmlconfig;
