mod credentials;
mod error;
pub mod image;
pub mod providers;
pub mod router;
pub mod routing;
#[cfg(feature = "server")]
pub mod server;
pub mod text;
pub mod types;
pub(crate) mod utils;

pub use credentials::Credentials;
pub use error::{Error, Result};
pub use image::ImageProvider;
pub use providers::{GeminiImage, Ideogram, Imagen, ProviderId};
pub use router::ImageRouter;
pub use routing::{ActionKind, RoutingTable};
pub use text::{
    RetryPolicy, TextClient, TextError, TextErrorKind, TextGeneration, TextProvider, TextRequest,
};
pub use types::{AspectRatio, GeneratedImage, ImageRequest, ReferenceImage};
