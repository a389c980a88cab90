//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the renderer:
//! - Math types and matrix helpers
//! - Logging initialisation

pub mod math;
pub mod logging;
