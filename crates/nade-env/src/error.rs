use nade_adversity::AdversityError;
use nade_core::AgentId;
use nade_engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    /// The adapter or engine failed while applying controls.  Fatal for the
    /// step: controls may have been partially applied, so the run aborts
    /// rather than continue from an inconsistent world.
    #[error("engine fault while processing agent {agent}: {source}")]
    Engine {
        agent: AgentId,
        #[source]
        source: EngineError,
    },

    /// Weight accumulation rejected a probability pair.
    #[error(transparent)]
    Weight(#[from] AdversityError),
}

pub type EnvResult<T> = Result<T, EnvError>;
