//! Prompt templates, one per content type.
//!
//! The catalog is a fixed table. Adding a content type means one new builder
//! and one new arm in [`template`].

use serde::Serialize;

use crate::models::ContentType;

pub type PromptBuilder = fn(prompt_text: &str, genre: &str) -> String;

#[derive(Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub placeholder: &'static str,
    pub builder: PromptBuilder,
}

impl PromptTemplate {
    pub fn build(&self, prompt_text: &str, genre: &str) -> String {
        (self.builder)(prompt_text, genre)
    }
}

static SHORT_STORY: PromptTemplate = PromptTemplate {
    name: "Short Story",
    description: "Generate a short story from a premise.",
    placeholder: "A detective who can talk to ghosts, trying to solve their own murder.",
    builder: short_story_prompt,
};

static HAIKU: PromptTemplate = PromptTemplate {
    name: "Poem (Haiku)",
    description: "Generate a haiku (5-7-5 syllables) about a specific theme.",
    placeholder: "An old, silent pond in autumn.",
    builder: haiku_prompt,
};

static SONNET: PromptTemplate = PromptTemplate {
    name: "Poem (Sonnet)",
    description: "Generate a Shakespearean sonnet.",
    placeholder: "The fleeting nature of a summer romance.",
    builder: sonnet_prompt,
};

static CHARACTER_BACKSTORY: PromptTemplate = PromptTemplate {
    name: "Character Backstory",
    description: "Create a detailed backstory for a character.",
    placeholder: "An exiled royal guard, now working as a baker, who secretly protects a hidden artifact.",
    builder: character_backstory_prompt,
};

static WORLD_BUILDING: PromptTemplate = PromptTemplate {
    name: "World Building Snippet",
    description: "Describe a unique location, culture, or concept for a fictional world.",
    placeholder: "A city built on the back of a colossal, sleeping beast.",
    builder: world_building_prompt,
};

pub fn template(content_type: ContentType) -> &'static PromptTemplate {
    match content_type {
        ContentType::ShortStory => &SHORT_STORY,
        ContentType::PoemHaiku => &HAIKU,
        ContentType::PoemSonnet => &SONNET,
        ContentType::CharacterBackstory => &CHARACTER_BACKSTORY,
        ContentType::WorldBuilding => &WORLD_BUILDING,
    }
}

/// Form-facing view of a template.
#[derive(Debug, Serialize, Clone)]
pub struct TemplateInfo {
    pub content_type: ContentType,
    pub label: &'static str,
    pub description: &'static str,
    pub placeholder: &'static str,
}

pub fn catalog() -> Vec<TemplateInfo> {
    ContentType::ALL
        .into_iter()
        .map(|content_type| {
            let t = template(content_type);
            TemplateInfo { content_type, label: content_type.label(), description: t.description, placeholder: t.placeholder }
        })
        .collect()
}

fn short_story_prompt(prompt_text: &str, genre: &str) -> String {
    format!(
        "You are a master storyteller. Your task is to write a compelling short story in the {genre} genre.\n\n\
        **Story Premise:**\n{prompt_text}\n\n\
        **Instructions:**\n\
        1. Establish a clear setting and atmosphere.\n\
        2. Introduce a compelling protagonist with clear motivations.\n\
        3. Build a narrative with a clear beginning, rising action, climax, and resolution.\n\
        4. Use vivid descriptions and engaging dialogue.\n\
        5. Ensure the story fits the specified premise and genre.\n\
        6. The story should be brief, concise, and no more than 200 words.\n"
    )
}

// Genre is not part of the haiku or sonnet forms.
fn haiku_prompt(prompt_text: &str, _genre: &str) -> String {
    format!(
        "You are a zen poet. Your task is to compose a haiku about the provided theme.\n\n\
        **Theme:**\n{prompt_text}\n\n\
        **Instructions:**\n\
        1. The poem must strictly follow the 5-7-5 syllable structure.\n\
        2. Evoke a clear image or feeling related to the theme.\n\
        3. The language should be simple, yet profound.\n\
        4. The output should be ONLY the three lines of the haiku.\n"
    )
}

fn sonnet_prompt(prompt_text: &str, _genre: &str) -> String {
    format!(
        "You are a classical poet in the style of William Shakespeare. Your task is to write a Shakespearean sonnet on the provided topic.\n\n\
        **Topic:**\n{prompt_text}\n\n\
        **Instructions:**\n\
        1. The sonnet must be exactly 14 lines long.\n\
        2. It must be written in iambic pentameter.\n\
        3. It must follow the ABAB CDCD EFEF GG rhyme scheme.\n\
        4. The final couplet should provide a resolution or a turn of thought (a volta).\n\
        5. Use elevated, poetic language appropriate for the form.\n\
        6. The output should be ONLY the 14 lines of the sonnet.\n"
    )
}

fn character_backstory_prompt(prompt_text: &str, genre: &str) -> String {
    format!(
        "You are a character designer for a {genre} story. Your task is to create a compelling backstory for a character based on the provided concept.\n\n\
        **Character Concept:**\n{prompt_text}\n\n\
        **Instructions:**\n\
        1. Give the character a name and a brief physical description.\n\
        2. Describe their formative years and the key events that shaped them.\n\
        3. Explain their primary motivation, their greatest fear, and their core conflict (internal or external).\n\
        4. Detail their key relationships (allies, enemies, family).\n\
        5. Weave the character concept into a rich, believable history.\n\
        6. The output should be a concise backstory of 1-2 paragraphs.\n"
    )
}

fn world_building_prompt(prompt_text: &str, genre: &str) -> String {
    format!(
        "You are a master world builder for the {genre} genre. Your task is to flesh out the provided concept into a rich and immersive world-building snippet.\n\n\
        **Concept:**\n{prompt_text}\n\n\
        **Instructions:**\n\
        1. Provide a vivid description of the location, culture, or concept. Engage multiple senses.\n\
        2. Explain how it functions and its role within the larger world.\n\
        3. Describe the people who interact with it and how it affects their daily lives.\n\
        4. Hint at its history, legends, or secrets.\n\
        5. The output should be a single, rich paragraph that is concise and evocative.\n"
    )
}
