use serde::{Deserialize, Serialize};

use crate::providers::ProviderId;
use crate::routing::ActionKind;

/// Supported output aspect ratios. Backends that speak a different
/// dialect (Ideogram) translate through [`AspectRatio::as_str`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:5")]
    Feed,
    #[serde(rename = "9:16")]
    Story,
    #[serde(rename = "16:9")]
    Wide,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Feed => "4:5",
            AspectRatio::Story => "9:16",
            AspectRatio::Wide => "16:9",
        }
    }

    pub(crate) fn ideogram_format(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1x1",
            AspectRatio::Portrait => "3x4",
            AspectRatio::Feed => "4x5",
            AspectRatio::Story => "9x16",
            AspectRatio::Wide => "16x9",
        }
    }
}

/// Optional style/content reference passed through to backends that
/// accept inline image conditioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub data_base64: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub action: ActionKind,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<ReferenceImage>,
}

impl ImageRequest {
    pub fn new(action: ActionKind, prompt: impl Into<String>) -> Self {
        Self {
            action,
            prompt: prompt.into(),
            aspect_ratio: None,
            reference_image: None,
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = Some(aspect_ratio);
        self
    }

    pub fn with_reference_image(mut self, reference_image: ReferenceImage) -> Self {
        self.reference_image = Some(reference_image);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub image_base64: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub provider_used: ProviderId,
}
