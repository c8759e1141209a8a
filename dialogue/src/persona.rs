//! Actor identities and the persona collaborator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Opaque key identifying a persona (e.g. `tomori`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against free text produced by a model.
    pub fn matches(&self, text: &str) -> bool {
        self.0.eq_ignore_ascii_case(text.trim())
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Display name and base system-prompt fragment for an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub display_name: String,
    pub prompt_fragment: String,
}

impl Persona {
    pub fn new(display_name: impl Into<String>, prompt_fragment: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            prompt_fragment: prompt_fragment.into(),
        }
    }
}

/// Resolves identities to personas. Pure lookup, no side effects.
pub trait PersonaProvider: Send + Sync {
    fn resolve(&self, id: &ActorId) -> Option<Persona>;
}

impl PersonaProvider for HashMap<ActorId, Persona> {
    fn resolve(&self, id: &ActorId) -> Option<Persona> {
        self.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_matches_ignores_case_and_padding() {
        let id = ActorId::new("tomori");
        assert!(id.matches("Tomori"));
        assert!(id.matches("  TOMORI "));
        assert!(!id.matches("anon"));
    }

    #[test]
    fn test_actor_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ActorId::new("soyo")).unwrap();
        assert_eq!(json, "\"soyo\"");
    }

    #[test]
    fn test_hashmap_provider() {
        let mut personas = HashMap::new();
        personas.insert(ActorId::new("taki"), Persona::new("Taki", "You are Taki."));
        assert_eq!(
            personas.resolve(&ActorId::new("taki")).unwrap().display_name,
            "Taki"
        );
        assert!(personas.resolve(&ActorId::new("rana")).is_none());
    }
}
