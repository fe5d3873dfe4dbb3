//! Parameter checks applied before a recommendation query
//!
//! # Validators
//! 1. **seed_budget** - Trims combined seeds to the service limit
//! 2. **parameter_validator** - Range and type checks, first failure reported

pub mod parameter_validator;
pub mod seed_budget;

pub use parameter_validator::{validate, ValidationError};
