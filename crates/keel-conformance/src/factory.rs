use keel_store::{StateStore, StoreResult};

/// Builds a fresh, empty store that shares no state with any other store
/// it has built.
pub trait Factory: Send + Sync {
    fn create(&self) -> StoreResult<Box<dyn StateStore>>;
}

impl<F> Factory for F
where
    F: Fn() -> StoreResult<Box<dyn StateStore>> + Send + Sync,
{
    fn create(&self) -> StoreResult<Box<dyn StateStore>> {
        self()
    }
}

/// Closes a live store and opens a new handle on the same durable medium.
pub trait RestartFactory: Send + Sync {
    fn restart(&self, store: Box<dyn StateStore>) -> StoreResult<Box<dyn StateStore>>;

    /// Whether a restarted store is guaranteed to see every write that
    /// returned success before the restart.
    fn is_durable(&self) -> bool;
}

/// Restart for backends without a durable medium: hands back the same
/// instance and does not claim durability.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRestart;

impl RestartFactory for NoRestart {
    fn restart(&self, store: Box<dyn StateStore>) -> StoreResult<Box<dyn StateStore>> {
        Ok(store)
    }

    fn is_durable(&self) -> bool {
        false
    }
}
