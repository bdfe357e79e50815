use nade_adversity::AdversityError;
use nade_core::CoreError;
use nade_engine::EngineError;
use nade_env::EnvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration rejected: {0}")]
    Config(#[from] CoreError),

    #[error("engine fault: {0}")]
    Engine(#[from] EngineError),

    #[error("environment fault: {0}")]
    Env(#[from] EnvError),

    #[error("adversity setup failed: {0}")]
    Adversity(#[from] AdversityError),
}

pub type SimResult<T> = Result<T, SimError>;
