pub mod applier;
pub mod customer;
pub mod disambiguator;
pub mod lifecycle;
pub mod normalizer;
pub mod operations;
pub mod status;
pub mod webhook_pipeline;
