//! API handlers module

pub mod attempts;
pub mod chat;
pub mod health;
pub mod history;
pub mod materials;
pub mod study;
