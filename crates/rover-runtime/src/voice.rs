//! Direct voice commands that bypass the AI layer.
//!
//! A spoken phrase that exactly matches an entry runs the mapped action
//! straight away.  For free text (e.g. an AI reply without brackets),
//! [`VoiceCommands::find_in`] picks out the first action phrase mentioned.

use rover_kernel::normalize_name;

/// Phrase → action name table.
#[derive(Debug, Clone)]
pub struct VoiceCommands {
    entries: Vec<(String, String)>,
}

impl VoiceCommands {
    /// Build a table from `(phrase, action)` pairs.  Phrases are normalised
    /// the same way action names are.
    pub fn new<I, P, A>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, A)>,
        P: AsRef<str>,
        A: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(p, a)| (normalize_name(p.as_ref()), a.into()))
                .collect(),
        }
    }

    /// The phrases the robot understands out of the box.
    pub fn standard() -> Self {
        Self::new([
            ("forward", "forward"),
            ("backward", "backward"),
            ("lie down", "lie"),
            ("stand", "stand"),
            ("sit", "sit"),
            ("bark", "bark"),
            ("bark harder", "bark harder"),
            ("pant", "pant"),
            ("howl", "howling"),
            ("wag tail", "wag_tail"),
            ("stretch", "stretch"),
            ("push up", "push up"),
            ("scratch", "scratch"),
            ("shake hands", "handshake"),
            ("high five", "high five"),
            ("lick hand", "lick hand"),
            ("shake head", "shake head"),
            ("relax neck", "relax neck"),
            ("nod", "nod"),
            ("think", "think"),
            ("recall", "recall"),
            ("head down", "head down"),
            ("fluster", "fluster"),
            ("surprise", "surprise"),
            ("dab", "dab"),
            ("floss", "floss"),
            ("whoa", "woah"),
            ("gangnam style", "gangnam style"),
            ("bottle flip", "bottle flip"),
            ("twerk", "twerk"),
            ("pray", "pray"),
            ("butt up", "butt up"),
        ])
    }

    /// Action for an utterance that is exactly a known phrase.
    pub fn resolve(&self, utterance: &str) -> Option<&str> {
        let key = normalize_name(utterance);
        self.entries
            .iter()
            .find(|(phrase, _)| *phrase == key)
            .map(|(_, action)| action.as_str())
    }

    /// Action for the earliest phrase mentioned anywhere in `text`, matched
    /// on word boundaries.  When two phrases start at the same place the
    /// longer one wins ("bark harder" over "bark").
    pub fn find_in(&self, text: &str) -> Option<&str> {
        let haystack = normalize_name(text);
        self.entries
            .iter()
            .filter_map(|(phrase, action)| {
                find_word(&haystack, phrase).map(|pos| (pos, phrase.len(), action))
            })
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
            .map(|(_, _, action)| action.as_str())
    }

    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, a)| a.as_str())
    }
}

fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    let is_boundary = |c: Option<char>| c.is_none_or(|c| !c.is_alphanumeric());
    haystack.match_indices(needle).map(|(i, _)| i).find(|&i| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + needle.len()..].chars().next();
        is_boundary(before) && is_boundary(after)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_kernel::ActionCatalog;

    #[test]
    fn every_standard_command_is_in_the_catalog() {
        let catalog = ActionCatalog::standard().unwrap();
        for action in VoiceCommands::standard().actions() {
            assert!(catalog.contains(action), "missing action {action}");
        }
    }

    #[test]
    fn resolve_matches_whole_utterance_only() {
        let v = VoiceCommands::standard();
        assert_eq!(v.resolve("Lie Down"), Some("lie"));
        assert_eq!(v.resolve("  howl "), Some("howling"));
        assert_eq!(v.resolve("please lie down"), None);
    }

    #[test]
    fn find_in_picks_earliest_mention() {
        let v = VoiceCommands::standard();
        assert_eq!(v.find_in("I will sit and then bark"), Some("sit"));
        assert_eq!(v.find_in("Time to bark harder!"), Some("bark harder"));
        assert_eq!(v.find_in("nothing to see here"), None);
    }

    #[test]
    fn find_in_respects_word_boundaries() {
        let v = VoiceCommands::new([("nod", "nod")]);
        assert_eq!(v.find_in("an anode"), None);
        assert_eq!(v.find_in("a quick nod."), Some("nod"));
    }
}
