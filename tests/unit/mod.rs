//! Unit-level tests exercised through the public API.

mod config_parsing;
mod conversion_values;
