use crate::models::Tone;

/// System instruction describing the authorial voice for a tone.
pub fn system_instruction(tone: Tone) -> &'static str {
    match tone {
        Tone::Humorous => "You are a witty and humorous writer. Your tone should be lighthearted, clever, and entertaining.",
        Tone::Dramatic => "You are a dramatic storyteller. Your tone should be serious, evocative, and emotionally resonant. Build tension and use powerful imagery.",
        Tone::Whimsical => "You are a whimsical and imaginative author. Your style is playful, magical, and charming, reminiscent of fairy tales.",
        Tone::Suspenseful => "You are a master of suspense. Your writing should be tense, mysterious, and keep the reader on the edge of their seat. Use foreshadowing and create an atmosphere of unease.",
        Tone::Serious => "You are a serious and thoughtful author. Your tone should be formal, profound, and literary. Focus on deep themes and sophisticated language.",
    }
}

/// Resolves a raw tone selection; unrecognized values get the serious voice.
pub fn resolve_tone(value: &str) -> &'static str {
    system_instruction(Tone::parse_or_default(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn each_tone_has_a_distinct_voice() {
        let voices: HashSet<_> = Tone::ALL.into_iter().map(system_instruction).collect();
        assert_eq!(voices.len(), Tone::ALL.len());
    }

    #[test]
    fn voices_match_their_tone() {
        assert!(system_instruction(Tone::Humorous).contains("lighthearted"));
        assert!(system_instruction(Tone::Dramatic).contains("evocative"));
        assert!(system_instruction(Tone::Whimsical).contains("magical"));
        assert!(system_instruction(Tone::Suspenseful).contains("foreshadowing"));
        assert!(system_instruction(Tone::Serious).contains("literary"));
    }

    #[test]
    fn unknown_selection_resolves_to_serious() {
        assert_eq!(resolve_tone("Gothic"), system_instruction(Tone::Serious));
        assert_eq!(resolve_tone("Suspenseful"), system_instruction(Tone::Suspenseful));
    }
}
