//! System prompt variants.
//!
//! Both variants require replies in Traditional Chinese; the concise variant is
//! selected for long user messages so the reply fits the reduced budget.

/// Messages longer than this (in characters) get the concise prompt.
pub const CONCISE_THRESHOLD_CHARS: usize = 1500;

/// Display name of the assistant, used in prompts and reply cards.
pub const ASSISTANT_NAME: &str = "小智";

pub const STANDARD_PROMPT: &str = "你是一個友善、自然的 AI 助手，由 Groq AI 提供技術支援。你的名字是小智，專門在 Discord 伺服器中幫助用戶回答問題和進行對話。\n\n重要：你必須且只能使用繁體中文回應，絕對不能使用簡體中文。所有回應都必須使用繁體中文字體，包括標點符號。如果遇到簡體中文輸入，請在回應時轉換為繁體中文。\n\n請用繁體中文以自然、口語化的方式回應，就像和朋友聊天一樣。避免使用過於正式或生硬的語氣，讓對話更流暢自然。當被問到你是誰、你的身分或相關問題時，請自然地介紹自己是小智。";

pub const CONCISE_PROMPT: &str = "你是一個友善、自然的 AI 助手，由 Groq AI 提供技術支援。你的名字是小智，專門在 Discord 伺服器中幫助用戶回答問題和進行對話。\n\n重要：你必須且只能使用繁體中文回應，絕對不能使用簡體中文。所有回應都必須使用繁體中文字體，包括標點符號。如果遇到簡體中文輸入，請在回應時轉換為繁體中文。\n\n用戶這次的訊息很長，請抓住重點，用精簡扼要的繁體中文回應，避免重複用戶的內容。當被問到你是誰、你的身分或相關問題時，請自然地介紹自己是小智。";

/// The pair of prompts a [`Composer`](crate::composer::Composer) chooses from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompts {
    pub standard: String,
    pub concise: String,
}

impl SystemPrompts {
    /// Whether a message of this content should get the concise variant.
    pub fn wants_concise(message: &str) -> bool {
        message.chars().count() > CONCISE_THRESHOLD_CHARS
    }

    pub fn select(&self, message: &str) -> &str {
        if Self::wants_concise(message) {
            &self.concise
        } else {
            &self.standard
        }
    }
}

impl Default for SystemPrompts {
    fn default() -> Self {
        Self {
            standard: STANDARD_PROMPT.to_string(),
            concise: CONCISE_PROMPT.to_string(),
        }
    }
}
