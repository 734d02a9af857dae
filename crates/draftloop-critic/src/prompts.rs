use draftloop_llm::ChatMessage;

/// Default maximum draft length the editor enforces
pub const DEFAULT_CHAR_LIMIT: usize = 280;

/// Token the editor replies with to approve a draft
pub const APPROVAL_TOKEN: &str = "YES";

/// Prompt templates for the writer and the editor
pub struct DraftPrompts;

impl DraftPrompts {
    /// Instruction for the first draft, used while there is no critique yet
    pub fn write_instruction() -> &'static str {
        "You are a writer. Write a short but impactful tweet on the topic."
    }

    /// Instruction for revising an existing draft against the editor's critique
    pub fn update_instruction(critique: &str) -> String {
        format!(
            "You are a writer. Update an existing tweet based on the criticism. Criticism: {}",
            critique
        )
    }

    /// Build the editor's review rules
    pub fn review_instruction(char_limit: usize) -> String {
        format!(
            r#"Review the following tweet draft.
Rules: It must be less than {limit} characters, contain no emojis or hashtags, and be clear and effective.
If the tweet is good enough, just write "{token}" to approve it; do not comment. If it is not good enough, explain why it needs to be corrected."#,
            limit = char_limit,
            token = APPROVAL_TOKEN,
        )
    }

    /// Writer messages: the instruction as system content, the draft (or topic) as user content
    pub fn writer_messages(draft: &str, critique: &str) -> Vec<ChatMessage> {
        let instruction = if critique.is_empty() {
            Self::write_instruction().to_string()
        } else {
            Self::update_instruction(critique)
        };

        vec![ChatMessage::system(instruction), ChatMessage::user(draft)]
    }

    /// Editor messages: the review rules as system content, the draft as user content
    pub fn editor_messages(draft: &str, char_limit: usize) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(Self::review_instruction(char_limit)),
            ChatMessage::user(draft),
        ]
    }
}
