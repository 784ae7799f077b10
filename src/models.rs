use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    ShortStory,
    PoemHaiku,
    PoemSonnet,
    CharacterBackstory,
    WorldBuilding,
}

impl ContentType {
    /// Form order.
    pub const ALL: [ContentType; 5] = [
        ContentType::ShortStory,
        ContentType::PoemHaiku,
        ContentType::PoemSonnet,
        ContentType::CharacterBackstory,
        ContentType::WorldBuilding,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ContentType::ShortStory => "Short Story",
            ContentType::PoemHaiku => "Poem (Haiku)",
            ContentType::PoemSonnet => "Poem (Sonnet)",
            ContentType::CharacterBackstory => "Character Backstory",
            ContentType::WorldBuilding => "World Building Snippet",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    Dramatic,
    Humorous,
    Whimsical,
    Suspenseful,
    Serious,
}

impl Tone {
    pub const ALL: [Tone; 5] = [Tone::Dramatic, Tone::Humorous, Tone::Whimsical, Tone::Suspenseful, Tone::Serious];

    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Dramatic => "Dramatic",
            Tone::Humorous => "Humorous",
            Tone::Whimsical => "Whimsical",
            Tone::Suspenseful => "Suspenseful",
            Tone::Serious => "Serious",
        }
    }

    /// Lenient parse used for form input. Anything unrecognized falls back to `Serious`.
    pub fn parse_or_default(value: &str) -> Tone {
        Tone::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value.trim()))
            .unwrap_or(Tone::Serious)
    }
}

/// One form submission. Never mutated after construction.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GenerationParams {
    pub content_type: ContentType,
    pub genre: String,
    pub tone: Tone,
    pub prompt_text: String,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            content_type: ContentType::ShortStory,
            genre: "Fantasy".to_string(),
            tone: Tone::Dramatic,
            prompt_text: String::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Performance {
    pub generation_time_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub id: String,
    pub params: GenerationParams,
    pub output: String,
    pub timestamp: DateTime<Utc>,
    pub performance: Performance,
}
