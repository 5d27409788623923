//! Router Module Index
//!
//! Organizes the routes into access-segregated modules. Access control is
//! applied per module with route layers, so a handler cannot be exposed
//! without its gate by accident.

/// Routes accessible to everyone: pages, login/signup, logout, health.
pub mod public;

/// Routes behind the `AuthUser` gate.
pub mod authenticated;

/// Routes behind the `AdminUser` gate.
pub mod admin;
