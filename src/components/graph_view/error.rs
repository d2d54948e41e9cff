use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphViewError {
	#[error("render surface '{0}' not found")]
	SurfaceNotFound(String),
}
