//! Market-data adapters normalizing external feeds to the core contracts.

pub mod yahoo;
