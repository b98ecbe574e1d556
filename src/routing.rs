use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::providers::ProviderId;
use crate::{Error, Result};

/// What category of club graphic is being requested. Drives the
/// provider priority chain in [`RoutingTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "generate_matchday_graphic")]
    MatchdayGraphic,
    #[serde(rename = "generate_result_graphic")]
    ResultGraphic,
    #[serde(rename = "generate_fixture_announcement")]
    FixtureAnnouncement,
    #[serde(rename = "generate_player_spotlight")]
    PlayerSpotlight,
    #[serde(rename = "generate_custom_image")]
    CustomImage,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::MatchdayGraphic,
        ActionKind::ResultGraphic,
        ActionKind::FixtureAnnouncement,
        ActionKind::PlayerSpotlight,
        ActionKind::CustomImage,
    ];

    /// Parses a possibly-namespaced action string (`"kind:variant"`).
    /// Unrecognized kinds degrade to [`ActionKind::CustomImage`] instead
    /// of erroring.
    pub fn classify(raw: &str) -> ActionKind {
        let kind = raw.split_once(':').map(|(kind, _)| kind).unwrap_or(raw);
        match kind.trim() {
            "generate_matchday_graphic" => ActionKind::MatchdayGraphic,
            "generate_result_graphic" => ActionKind::ResultGraphic,
            "generate_fixture_announcement" => ActionKind::FixtureAnnouncement,
            "generate_player_spotlight" => ActionKind::PlayerSpotlight,
            "generate_custom_image" => ActionKind::CustomImage,
            _ => ActionKind::CustomImage,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::MatchdayGraphic => "generate_matchday_graphic",
            ActionKind::ResultGraphic => "generate_result_graphic",
            ActionKind::FixtureAnnouncement => "generate_fixture_announcement",
            ActionKind::PlayerSpotlight => "generate_player_spotlight",
            ActionKind::CustomImage => "generate_custom_image",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static action-kind to provider-chain mapping. Configuration, not
/// runtime state: validated once at router construction and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingTable {
    chains: HashMap<ActionKind, Vec<ProviderId>>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        // Text-heavy graphics (dates, scores, kick-off times) lead with
        // the text-accurate backend; everything else leads with the
        // high-fidelity one.
        let text_first = vec![ProviderId::Ideogram, ProviderId::Gemini, ProviderId::Imagen];
        let fidelity_first = vec![ProviderId::Gemini, ProviderId::Imagen, ProviderId::Ideogram];

        let mut chains = HashMap::new();
        chains.insert(ActionKind::MatchdayGraphic, text_first.clone());
        chains.insert(ActionKind::ResultGraphic, text_first.clone());
        chains.insert(ActionKind::FixtureAnnouncement, text_first);
        chains.insert(ActionKind::PlayerSpotlight, fidelity_first.clone());
        chains.insert(ActionKind::CustomImage, fidelity_first);
        Self { chains }
    }
}

impl RoutingTable {
    pub fn new(chains: HashMap<ActionKind, Vec<ProviderId>>) -> Self {
        Self { chains }
    }

    /// Ordered candidate providers for an action kind. Empty only if the
    /// table is malformed, which [`RoutingTable::validate`] rejects.
    pub fn candidates(&self, kind: ActionKind) -> &[ProviderId] {
        self.chains.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Build-time invariant: every action kind maps to a non-empty chain
    /// and every referenced provider is registered.
    pub fn validate(&self, registered: &[ProviderId]) -> Result<()> {
        for kind in ActionKind::ALL {
            let chain = self.candidates(kind);
            if chain.is_empty() {
                return Err(Error::Routing(format!(
                    "no providers configured for action {kind}"
                )));
            }
            for id in chain {
                if !registered.contains(id) {
                    return Err(Error::Routing(format!(
                        "provider {id} referenced for {kind} is not registered"
                    )));
                }
            }
        }
        Ok(())
    }
}
