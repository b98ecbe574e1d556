mod gemini;
mod ideogram;
mod imagen;

pub use gemini::GeminiImage;
pub use ideogram::Ideogram;
pub use imagen::Imagen;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an image-generation backend, referenced by the routing
/// table and reported back on every generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Gemini,
    Imagen,
    Ideogram,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "gemini",
            ProviderId::Imagen => "imagen",
            ProviderId::Ideogram => "ideogram",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
