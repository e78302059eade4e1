pub mod common;
pub mod error;
pub mod media;
pub mod parsers;
pub mod recognizer;
pub mod resolver;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod tiers;

pub use common::{
    credentials::{CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore},
    request::{FetchRequest, FetchResponse, ReqwestTransport, Transport, TransportError, TransportOptions},
};
pub use error::{ExtractError, ExtractResult};
pub use media::{CarouselItem, ItemKind, Media, MediaKind};
pub use recognizer::UrlRecognizer;
pub use resolver::{MediaResolver, MediaSource};
pub use tiers::Endpoints;
