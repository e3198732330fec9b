//! Site-wide presentation settings: section order, ad slots, the friendly-site
//! network, social-proof notices and the silent refresh switch.

use serde::{Deserialize, Serialize};

use crate::domain::article::Article;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdPosition {
    Top,
    Middle,
    Bottom,
    /// Full-width zone; while active it suppresses every positional slot.
    Heavy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdSlot {
    pub id: String,
    pub position: AdPosition,
    pub content: String,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    Featured,
    Premium,
    AdTop,
    Grid,
    AdMiddle,
    Network,
    AdBottom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendlySite {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// A short "someone just did this" notice shown on article pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialProof {
    pub id: String,
    pub text: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteLayout {
    pub sections: Vec<Section>,
    pub ad_slots: Vec<AdSlot>,
    pub network: Vec<FriendlySite>,
    #[serde(default)]
    pub social_proofs: Vec<SocialProof>,
    /// Broadcast a silent refresh to every open home page.
    #[serde(default)]
    pub silent_refresh: bool,
}

/// Banner slots of an article page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArticleAds<'a> {
    pub top: Option<&'a AdSlot>,
    pub middle: Option<&'a AdSlot>,
    pub bottom: Option<&'a AdSlot>,
}

impl SiteLayout {
    pub fn heavy_ad(&self) -> Option<&AdSlot> {
        self.ad_slots
            .iter()
            .find(|slot| slot.position == AdPosition::Heavy && slot.active)
    }

    /// The slot rendered at `position`. Hidden whenever a heavy ad is active,
    /// regardless of the slot's own flag.
    pub fn positional_ad(&self, position: AdPosition) -> Option<&AdSlot> {
        if position == AdPosition::Heavy || self.heavy_ad().is_some() {
            return None;
        }
        self.ad_slots
            .iter()
            .find(|slot| slot.position == position && slot.active)
    }

    pub fn article_ads(&self, article: &Article) -> ArticleAds<'_> {
        if !article.details.show_ads {
            return ArticleAds::default();
        }
        ArticleAds {
            top: self.positional_ad(AdPosition::Top),
            middle: self.positional_ad(AdPosition::Middle),
            bottom: self.positional_ad(AdPosition::Bottom),
        }
    }

    /// Texts of the notices currently switched on.
    pub fn active_social_proofs(&self) -> Vec<String> {
        self.social_proofs
            .iter()
            .filter(|proof| proof.active && !proof.text.trim().is_empty())
            .map(|proof| proof.text.clone())
            .collect()
    }

    pub fn visible_sections(&self) -> impl Iterator<Item = SectionKind> + '_ {
        self.sections
            .iter()
            .filter(|section| section.visible)
            .map(|section| section.kind)
    }

    /// Each section kind may appear at most once.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for section in &self.sections {
            if !seen.insert(section.kind) {
                return Err(format!("section {:?} listed twice", section.kind));
            }
        }
        Ok(())
    }
}

impl Default for SiteLayout {
    fn default() -> Self {
        use SectionKind::*;

        let sections = [Featured, Premium, AdTop, Grid, AdMiddle, Network, AdBottom]
            .into_iter()
            .map(|kind| Section { kind, visible: true })
            .collect();
        let ad_slots = [
            ("1", AdPosition::Top, "Top Banner Ad", true),
            ("2", AdPosition::Middle, "Mid-Page Ad", true),
            ("3", AdPosition::Bottom, "Footer Ad", true),
            ("4", AdPosition::Heavy, "Heavy Full-Screen Ad", false),
        ]
        .into_iter()
        .map(|(id, position, content, active)| AdSlot {
            id: id.to_string(),
            position,
            content: content.to_string(),
            active,
        })
        .collect();

        Self {
            sections,
            ad_slots,
            network: Vec::new(),
            social_proofs: Vec::new(),
            silent_refresh: false,
        }
    }
}
