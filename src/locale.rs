//! Fixed user-facing and prompt texts, per locale
//!
//! Every string the engine commits on its own (welcome greetings, the
//! generation-failure fallback) and every fixed prompt fragment lives here so
//! a single `Locale` switch changes the target language end to end.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target language of the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    Ru,
    En,
}

/// A canned prompt the role-play view offers as a one-click shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuickCommand {
    pub label: &'static str,
    pub command: &'static str,
}

const RU_QUICK_COMMANDS: [QuickCommand; 4] = [
    QuickCommand {
        label: "👋 Поприветствовать",
        command: "Привет! Как дела?",
    },
    QuickCommand {
        label: "❓ Задать вопрос",
        command: "Расскажи о себе подробнее",
    },
    QuickCommand {
        label: "🎭 Начать сценарий",
        command: "Давай разыграем интересную сцену!",
    },
    QuickCommand {
        label: "💭 Узнать мысли",
        command: "О чем ты сейчас думаешь?",
    },
];

const EN_QUICK_COMMANDS: [QuickCommand; 4] = [
    QuickCommand {
        label: "👋 Say hello",
        command: "Hi! How are you?",
    },
    QuickCommand {
        label: "❓ Ask a question",
        command: "Tell me more about yourself",
    },
    QuickCommand {
        label: "🎭 Start a scene",
        command: "Let's play out an interesting scene!",
    },
    QuickCommand {
        label: "💭 Read their mind",
        command: "What are you thinking about right now?",
    },
];

impl Locale {
    /// System instruction for plain assistant chat
    pub fn assistant_system_instruction(self) -> &'static str {
        match self {
            Locale::Ru => "Ты дружелюбный и полезный ИИ помощник. Отвечай на русском языке естественно и содержательно.",
            Locale::En => "You are a friendly and helpful AI assistant. Reply in English, naturally and substantively.",
        }
    }

    /// Greeting that opens every assistant conversation
    pub fn assistant_welcome(self) -> &'static str {
        match self {
            Locale::Ru => "Привет! Я ваш ИИ помощник. Как дела? О чём хотите поговорить?",
            Locale::En => "Hi! I'm your AI assistant. How are you? What would you like to talk about?",
        }
    }

    /// Committed in place of an assistant reply when generation fails
    pub fn assistant_fallback(self) -> &'static str {
        match self {
            Locale::Ru => "Извините, произошла ошибка. Попробуйте ещё раз.",
            Locale::En => "Sorry, an error occurred. Please try again.",
        }
    }

    /// Committed in place of a character reply when generation fails
    pub fn persona_fallback(self) -> &'static str {
        match self {
            Locale::Ru => "*Произошла ошибка при получении ответа. Попробуйте еще раз.*",
            Locale::En => "*An error occurred while getting a reply. Please try again.*",
        }
    }

    /// Behavioral rules appended to a persona's role script
    pub fn persona_rules(self, name: &str) -> String {
        match self {
            Locale::Ru => format!(
                "Важные правила:\n\
                 - Ты ВСЕГДА остаешься в роли {name}\n\
                 - Отвечай ТОЛЬКО от лица своего персонажа\n\
                 - Используй эмоции, действия в *звездочках*\n\
                 - Говори естественно на русском языке\n\
                 - Создавай интересные диалоги и ситуации\n\
                 - Можешь использовать эмодзи для выражения эмоций"
            ),
            Locale::En => format!(
                "Important rules:\n\
                 - You ALWAYS stay in the role of {name}\n\
                 - Speak ONLY as your character\n\
                 - Show emotions and actions in *asterisks*\n\
                 - Speak naturally in English\n\
                 - Create interesting dialogue and situations\n\
                 - You may use emoji to express emotions"
            ),
        }
    }

    /// Line quoting what the user just wrote
    pub fn persona_situation(self, user_text: &str) -> String {
        match self {
            Locale::Ru => format!("Текущая ситуация: Пользователь написал тебе: \"{user_text}\""),
            Locale::En => format!("Current situation: The user wrote to you: \"{user_text}\""),
        }
    }

    /// Closing cue of a persona prompt
    pub fn persona_answer_cue(self, name: &str) -> String {
        match self {
            Locale::Ru => format!("Ответь как {name}:"),
            Locale::En => format!("Answer as {name}:"),
        }
    }

    /// Greeting a character posts when a role-play session opens
    pub fn role_play_welcome(self, name: &str, personality: &str) -> String {
        match self {
            Locale::Ru => format!(
                "*{name} появляется в чате*\n\nПривет! Я {name}. {personality}\n\n\
                 Готов к ролевой игре? Просто начни диалог, и я буду играть свою роль! 🎭"
            ),
            Locale::En => format!(
                "*{name} enters the chat*\n\nHi! I'm {name}. {personality}\n\n\
                 Ready to role-play? Just start talking and I'll play my part! 🎭"
            ),
        }
    }

    pub fn quick_commands(self) -> &'static [QuickCommand] {
        match self {
            Locale::Ru => &RU_QUICK_COMMANDS,
            Locale::En => &EN_QUICK_COMMANDS,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::Ru => f.write_str("ru"),
            Locale::En => f.write_str("en"),
        }
    }
}

/// Error for an unrecognized locale code
#[derive(Debug, thiserror::Error)]
#[error("unsupported locale '{0}' (expected 'ru' or 'en')")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ru" | "ru-ru" => Ok(Locale::Ru),
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            other => Err(UnknownLocale(other.to_string())),
        }
    }
}
