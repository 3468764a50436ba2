//! modscope - Puppetfile dependency parser and module usage attribution
//!
//! This crate recovers module declarations from Puppetfiles without
//! executing them, and attributes the classes, functions and resource types
//! a module uses to the dependencies it declares.

pub mod analysis;
pub mod export;
pub mod logging;
pub mod parser;
