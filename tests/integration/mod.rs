//! Integration tests for typed scope keys

mod boxed_keys;
mod composition;
mod pipeline_flow;
