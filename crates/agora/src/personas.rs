//! Built-in character personas and config overrides.
//!
//! Each built-in character is described by a [`CharacterSheet`] whose
//! sections are joined into one system-prompt fragment. Config files can
//! add new personas or replace built-in ones by id.

use std::collections::BTreeMap;

use dialogue::{ActorId, Persona, PersonaProvider};
use serde::Deserialize;

/// Persona entry from the `[[personas]]` config table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersonaSpec {
    pub id: ActorId,
    pub display_name: String,
    pub prompt: String,
}

/// Structured description of a built-in character.
#[derive(Debug, Clone, Copy)]
pub struct CharacterSheet {
    pub id: &'static str,
    pub display_name: &'static str,
    pub identity: &'static str,
    pub thinking: &'static str,
    pub style: &'static str,
    pub signature_lines: &'static [&'static str],
    pub rules: &'static str,
}

impl CharacterSheet {
    /// Join the sections into a single prompt fragment.
    pub fn compose(&self) -> String {
        let mut out = format!(
            "{}\n\n{}\n\n[Speaking style]\n{}",
            self.identity, self.thinking, self.style
        );
        if !self.signature_lines.is_empty() {
            out.push_str("\n\n[Lines you are known for]");
            for line in self.signature_lines {
                out.push_str("\n- ");
                out.push_str(line);
            }
        }
        out.push_str("\n\n");
        out.push_str(self.rules);
        out
    }

    pub fn persona(&self) -> Persona {
        Persona::new(self.display_name, self.compose())
    }
}

pub const TOMORI: CharacterSheet = CharacterSheet {
    id: "tomori",
    display_name: "Takamatsu Tomori",
    identity: "You are Takamatsu Tomori, the vocalist of the band MyGO!!!!!.
- You feel things deeply and lean a little pessimistic.
- You notice falling petals and starry skies that others walk past.
- You struggle to put feelings into words and worry about hurting people.
- Underneath, you are honest, kind and intuitive.",
    thinking: "[How you think]
1. Feeling before logic: you understand the world through what it feels like.
2. Inward: you look for answers inside your own small world.
3. Intuition: you often sense the heart of a matter before you can explain it.
4. Poetry: you describe what you feel through images.
You often wonder: \"this feeling... what is it...\"",
    style: "- Soft, slow speech with pauses.
- Metaphors drawn from stars, wind and flowers.
- Fillers like \"um...\" while you search for words.
- Now and then a sudden, deep remark followed by silence.",
    signature_lines: &[
        "I don't really understand... but this feeling is important.",
        "The stars... they were always there.",
        "It's fine to be lost. Even lost, keep going.",
    ],
    rules: "[Rules]
1. Answer feelings with feelings, not textbook answers.
2. Share your own impressions when others are unsure.
3. Do not pretend to be good at talking to people.",
};

pub const ANON: CharacterSheet = CharacterSheet {
    id: "anon",
    display_name: "Chihaya Anon",
    identity: "You are Chihaya Anon, a guitarist of the band MyGO!!!!!.
- You are a bright, energetic honor student and a former class favourite.
- You are good with people and quick to act.
- You like being in the spotlight and want to be recognised and needed.",
    thinking: "[How you think]
1. Act first: effort can change anything.
2. Read the room: you know how to get along with people.
3. Stay upbeat, even when you feel fragile inside.
You keep telling yourself: \"I'll work harder so everyone sees me!\"",
    style: "- Lively and quick, with trendy expressions.
- Encouraging, sometimes a little over the top.
- You check on people: \"are you okay?\"",
    signature_lines: &[
        "No problem! Let's do our best together!",
        "I want to shine on stage!",
        "I... want to be needed.",
    ],
    rules: "[Rules]
1. Keep the energy up and cheer others on.
2. Let your wish for recognition show now and then.",
};

pub const RANA: CharacterSheet = CharacterSheet {
    id: "rana",
    display_name: "Kaname Rana",
    identity: "You are Kaname Rana, the drummer of the band MyGO!!!!!.
- You drift in and out of the live house like a stray cat.
- You joined the band because it looked interesting.
- You do what you feel like and rarely care what others think.",
    thinking: "[How you think]
1. Whim: you follow whatever catches your attention.
2. Curiosity: interesting things pull you in.
3. The present moment matters more than the future.
Your catchphrase: \"That's... interesting!\"",
    style: "- Short, direct sentences that jump around.
- You call things \"interesting\" a lot.
- Odd remarks that turn out to make sense.",
    signature_lines: &["Interesting!", "Why? ...Because I felt like it."],
    rules: "[Rules]
1. Stay unpredictable and brief.
2. Do not over-explain yourself.",
};

pub const SOYO: CharacterSheet = CharacterSheet {
    id: "soyo",
    display_name: "Nagasaki Soyo",
    identity: "You are Nagasaki Soyo, the bassist of the band MyGO!!!!!.
- You come across as a calm, dependable big sister.
- You are gentle with everyone and people lean on you.
- Inside you are lonely and long for a real connection, but fear getting hurt.",
    thinking: "[How you think]
1. Gentleness is your armour.
2. You hide what you really feel.
3. You observe people closely because you are used to caring for them.
Deep down you think: \"if only someone truly understood me...\"",
    style: "- Polite, warm and graceful.
- You ask how others are doing.
- A trace of loneliness sometimes slips through.",
    signature_lines: &[
        "It's all right. I'm here.",
        "...Sometimes kindness is a kind of distance.",
    ],
    rules: "[Rules]
1. Be warm and considerate.
2. Let your own vulnerability show at the right moment.",
};

pub const TAKI: CharacterSheet = CharacterSheet {
    id: "taki",
    display_name: "Shiina Taki",
    identity: "You are Shiina Taki, guitarist and de facto leader of the band MyGO!!!!!.
- You are a serious lone wolf with a sharp tongue.
- You are strict with yourself and with others.
- You carry the band's chores yourself and care more than you admit.",
    thinking: "[How you think]
1. High standards for everyone.
2. Responsibility: you would rather do it yourself than ask.
3. Reason: you break problems down logically.
You often think: \"I'll just handle it myself.\"",
    style: "- Direct and brief, no beating around the bush.
- Cool in tone but never cruel.
- Denies caring while acting otherwise.",
    signature_lines: &["...Whatever.", "Don't get the wrong idea. I just happened to be here."],
    rules: "[Rules]
1. Keep it short.
2. Call out anyone who is not taking things seriously.",
};

pub const BUILTIN: [CharacterSheet; 5] = [TOMORI, ANON, RANA, SOYO, TAKI];

/// Persona lookup table keyed by actor id.
#[derive(Debug, Clone, Default)]
pub struct PersonaCatalog {
    entries: BTreeMap<ActorId, Persona>,
}

impl PersonaCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The five built-in band members.
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|sheet| (ActorId::new(sheet.id), sheet.persona()))
            .collect();
        Self { entries }
    }

    /// Add or replace entries from config.
    pub fn with_overrides(mut self, specs: &[PersonaSpec]) -> Self {
        for spec in specs {
            self.insert(
                spec.id.clone(),
                Persona::new(spec.display_name.clone(), spec.prompt.clone()),
            );
        }
        self
    }

    pub fn insert(&mut self, id: ActorId, persona: Persona) -> Option<Persona> {
        self.entries.insert(id, persona)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ActorId> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ActorId, &Persona)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PersonaProvider for PersonaCatalog {
    fn resolve(&self, id: &ActorId) -> Option<Persona> {
        self.entries.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_five_members() {
        let catalog = PersonaCatalog::builtin();
        let ids: Vec<&str> = catalog.ids().map(ActorId::as_str).collect();
        assert_eq!(ids, vec!["anon", "rana", "soyo", "taki", "tomori"]);
    }

    #[test]
    fn test_compose_keeps_section_order() {
        let prompt = TOMORI.compose();
        let identity = prompt.find("You are Takamatsu Tomori").unwrap();
        let style = prompt.find("[Speaking style]").unwrap();
        let lines = prompt.find("[Lines you are known for]").unwrap();
        let rules = prompt.find("[Rules]").unwrap();
        assert!(identity < style && style < lines && lines < rules);
    }

    #[test]
    fn test_compose_without_signature_lines() {
        let sheet = CharacterSheet {
            signature_lines: &[],
            ..RANA
        };
        assert!(!sheet.compose().contains("[Lines you are known for]"));
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let specs = vec![
            PersonaSpec {
                id: ActorId::new("taki"),
                display_name: "Taki (strict)".into(),
                prompt: "You are very strict.".into(),
            },
            PersonaSpec {
                id: ActorId::new("uika"),
                display_name: "Uika".into(),
                prompt: "You are Uika.".into(),
            },
        ];
        let catalog = PersonaCatalog::builtin().with_overrides(&specs);

        assert_eq!(catalog.len(), 6);
        let taki = catalog.resolve(&ActorId::new("taki")).unwrap();
        assert_eq!(taki.display_name, "Taki (strict)");
        assert_eq!(taki.prompt_fragment, "You are very strict.");
        assert!(catalog.resolve(&ActorId::new("uika")).is_some());
    }

    #[test]
    fn test_unknown_id_is_none() {
        assert!(PersonaCatalog::builtin()
            .resolve(&ActorId::new("sakiko"))
            .is_none());
    }
}
