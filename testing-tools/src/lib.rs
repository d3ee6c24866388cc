// Testing Tools Library
//
// This crate provides integration testing utilities for the push relay.
// Currently includes:
// - sse-test-client: drives a running relay over HTTP and checks what its streams receive

pub mod api_client;
pub mod output;
pub mod scenarios;
pub mod sse_client;
