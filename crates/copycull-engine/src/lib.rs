//! copycull_engine - Row selection, formula templates and Rhai scripting.

pub mod engine;
pub mod error;
pub mod script;

pub use error::{EngineError, Result};
