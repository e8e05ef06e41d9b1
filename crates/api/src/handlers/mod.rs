//! HTTP route handlers organized by functional area.

pub mod attempts;
pub mod execute;
pub mod expected;
pub mod grade;
pub mod health;
pub mod provision;
