//! HTTP request handlers organized by functionality

pub mod health;
pub mod skills;
