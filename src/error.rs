use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HeapError {
  /// No arena could hold the request and a new one could not be mapped,
  /// either because the OS refused or the heap budget is spent.
  #[error("out of memory: could not satisfy a request for {requested} bytes")]
  OutOfMemory { requested: usize },
  #[error("invalid heap configuration: {0}")]
  InvalidConfig(&'static str),
}
