use crate::autosave::AutoSaveError;
use sf_api::ApiError;
use sf_core::CoreError;
use sf_stream::StreamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    AutoSave(#[from] AutoSaveError),
    #[error(transparent)]
    Core(#[from] CoreError),
}
