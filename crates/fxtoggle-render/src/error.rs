use fxtoggle_api::{HostError, Resource};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("texture binding {0:?} is not registered")]
    UnknownBinding(String),
    #[error("resource {0:?} is not a 2D texture")]
    NotATexture(Resource),
    #[error("effect runtime is not attached")]
    NoRuntime,
    #[error(transparent)]
    Host(#[from] HostError),
}
