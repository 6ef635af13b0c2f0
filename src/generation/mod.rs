pub mod client;
pub mod request;

pub use client::{
    GeminiTransport, GenerationClient, GenerationError, GenerationTransport,
};
pub use request::{build_from_session, PreparedRequest, ValidationError};

#[cfg(test)]
pub(crate) use client::fakes;
#[cfg(test)]
pub(crate) use request::RequestPart;
