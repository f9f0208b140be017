use fleetwatch_client::ClientError;
use fleetwatch_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Client(#[from] ClientError),
}
