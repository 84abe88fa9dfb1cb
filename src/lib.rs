// src/lib.rs — Library root for banter

pub mod api;
pub mod chat;
pub mod cli;
pub mod infra;
pub mod provider;
