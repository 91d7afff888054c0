//! Static catalog of selectable GigaChat models.
//!
//! Entries are immutable and presented in catalog order (the selection menu
//! is built from it). Model ids are always resolved through [`ModelRegistry::get`];
//! an id the catalog does not know is a typed error, never a silent fallback.

use thiserror::Error;

/// Pricing/capability tier of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Lite,
    Plus,
    Pro,
}

impl ModelTier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lite => "Lite",
            Self::Plus => "Plus",
            Self::Pro => "Pro",
        }
    }
}

/// One selectable model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelEntry {
    /// API identifier sent to the gateway and used as callback data.
    pub id: &'static str,
    /// Human-readable name shown in menus and replies.
    pub display_name: &'static str,
    /// Context window size in tokens.
    pub context_window: u32,
    pub tier: ModelTier,
}

/// Lookup failure for an id absent from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown model id: {0}")]
pub struct UnknownModel(pub String);

const CATALOG: &[ModelEntry] = &[
    ModelEntry {
        id: "GigaChat",
        display_name: "GigaChat Lite",
        context_window: 8192,
        tier: ModelTier::Lite,
    },
    ModelEntry {
        id: "GigaChat-Plus",
        display_name: "GigaChat Lite+",
        context_window: 32768,
        tier: ModelTier::Plus,
    },
    ModelEntry {
        id: "GigaChat-Pro",
        display_name: "GigaChat Pro",
        context_window: 8192,
        tier: ModelTier::Pro,
    },
];

/// Read-only registry over the built-in catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelRegistry;

impl ModelRegistry {
    /// All entries in stable catalog order.
    pub fn list(self) -> &'static [ModelEntry] {
        CATALOG
    }

    /// The entry new sessions start with.
    pub fn default_entry(self) -> &'static ModelEntry {
        &CATALOG[0]
    }

    /// Resolve an id to its entry.
    pub fn get(self, id: &str) -> Result<&'static ModelEntry, UnknownModel> {
        CATALOG
            .iter()
            .find(|entry| entry.id == id)
            .ok_or_else(|| UnknownModel(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_entry_is_lite() {
        let registry = ModelRegistry;
        assert_eq!(registry.default_entry().id, "GigaChat");
        assert_eq!(registry.default_entry().display_name, "GigaChat Lite");
    }

    #[test]
    fn list_order_is_stable() {
        let ids: Vec<&str> = ModelRegistry.list().iter().map(|e| e.id).collect();
        assert_eq!(ids, ["GigaChat", "GigaChat-Plus", "GigaChat-Pro"]);
    }

    #[test]
    fn get_known_id() {
        let entry = ModelRegistry.get("GigaChat-Plus").unwrap();
        assert_eq!(entry.display_name, "GigaChat Lite+");
        assert_eq!(entry.context_window, 32768);
        assert_eq!(entry.tier, ModelTier::Plus);
    }

    #[test]
    fn get_unknown_id_is_error() {
        let err = ModelRegistry.get("GigaChat-Max").unwrap_err();
        assert_eq!(err, UnknownModel("GigaChat-Max".into()));
    }

    #[test]
    fn exact_match_not_substring() {
        // "GigaChat-Pro2" must not resolve via containment
        assert!(ModelRegistry.get("GigaChat-Pro2").is_err());
        assert!(ModelRegistry.get("igaChat").is_err());
    }
}
