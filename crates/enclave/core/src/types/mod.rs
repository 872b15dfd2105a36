//! Data model shared by the enclave and its callers.

pub mod account;
pub mod config;
pub mod message;
pub mod output;
pub mod proposal;
pub mod request;
