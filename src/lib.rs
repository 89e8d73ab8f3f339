pub mod common;
pub mod engine;
pub mod gateway;
pub mod mirror;
pub mod model;
pub mod opener;
