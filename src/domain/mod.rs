pub mod commerce;
pub mod error;
pub mod event;
pub mod gateway;
pub mod id;
pub mod ledger;
pub mod money;
pub mod region;

use std::{future::Future, pin::Pin};

/// Boxed future returned by the collaborator traits so they stay object safe.
pub type EngineFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, error::EngineError>> + Send + 'a>>;
