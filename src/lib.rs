//! Ecofarm Calculator
//!
//! Feed, land and capacity planning for mixed livestock farms. The
//! [`calculator::Calculator`] runs pure simulations against a validated
//! [`catalog::ReferenceCatalog`]; the remaining modules store, import and
//! present that data.

pub mod calculator;
pub mod catalog;
pub mod db;
pub mod import;
pub mod models;
pub mod reference;
pub mod report;
pub mod scenario;
