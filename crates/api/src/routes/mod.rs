//! Route Handlers

pub mod predictions;
pub mod status;
