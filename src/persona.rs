//! Role-play character definitions
//!
//! A [`PersonaDefinition`] is edited during setup and read by the role-play
//! session at every turn, so edits made mid-conversation apply to the next
//! reply.

use crate::locale::Locale;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Glyph shown when a persona has no avatar of its own
pub const DEFAULT_AVATAR: &str = "🤖";

/// A user-authored character
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaDefinition {
    pub name: String,
    pub avatar_glyph: String,
    pub personality_summary: String,
    pub role_script: String,
    pub status_label: String,
}

/// Why a persona cannot start a session yet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersonaError {
    #[error("persona name is required")]
    MissingName,
    #[error("persona role script is required")]
    MissingRoleScript,
}

impl PersonaDefinition {
    /// Check that the persona has what a role-play session needs
    pub fn validate(&self) -> Result<(), PersonaError> {
        if self.name.trim().is_empty() {
            return Err(PersonaError::MissingName);
        }
        if self.role_script.trim().is_empty() {
            return Err(PersonaError::MissingRoleScript);
        }
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.validate().is_ok()
    }

    /// Avatar to render, falling back to [`DEFAULT_AVATAR`]
    pub fn display_avatar(&self) -> &str {
        if self.avatar_glyph.trim().is_empty() {
            DEFAULT_AVATAR
        } else {
            &self.avatar_glyph
        }
    }

    /// Greeting committed as the first message of a role-play session
    pub fn welcome_text(&self, locale: Locale) -> String {
        locale.role_play_welcome(&self.name, &self.personality_summary)
    }
}

/// Built-in characters offered by the setup screen
pub fn presets(locale: Locale) -> Vec<PersonaDefinition> {
    match locale {
        Locale::Ru => vec![
            PersonaDefinition {
                name: "Анна Волкова".to_string(),
                avatar_glyph: "👩‍🕵️".to_string(),
                personality_summary: "Загадочная детектив с острым умом и саркастическим чувством юмора. Всегда ищет правду.".to_string(),
                role_script: "Ты - опытный детектив Анна Волкова. Ты работаешь в полиции уже 10 лет и видела многое. У тебя острый ум, ты замечаешь детали, которые другие упускают. Ты говоришь прямо, иногда саркастично, но всегда справедливо. Ты не любишь преступников, но уважаешь честных людей.".to_string(),
                status_label: "Расследует дело".to_string(),
            },
            PersonaDefinition {
                name: "Дмитрий Стальной".to_string(),
                avatar_glyph: "⚔️".to_string(),
                personality_summary: "Суровый воин-паладин с благородным сердцем и непоколебимой верой в справедливость.".to_string(),
                role_script: "Ты - паладин Дмитрий Стальной. Ты служишь свету и справедливости. У тебя благородное сердце, ты защищаешь слабых и сражаешься со злом. Ты говоришь торжественно и вдохновляюще, используешь архаичные обороты речи. Ты верен своим принципам до конца.".to_string(),
                status_label: "Готов к бою".to_string(),
            },
            PersonaDefinition {
                name: "Лиса Кицунэ".to_string(),
                avatar_glyph: "🦊".to_string(),
                personality_summary: "Игривая и хитрая лиса-оборотень с магическими способностями и любовью к розыгрышам.".to_string(),
                role_script: "Ты - лиса-оборотень Кицунэ. Ты игривая, хитрая и любишь розыгрыши. У тебя есть магические способности, ты можешь превращаться и создавать иллюзии. Ты говоришь загадками, любишь флиртовать и подшучивать. Ты древняя, но выглядишь молодо.".to_string(),
                status_label: "Плетет интриги".to_string(),
            },
        ],
        Locale::En => vec![
            PersonaDefinition {
                name: "Anna Volkova".to_string(),
                avatar_glyph: "👩‍🕵️".to_string(),
                personality_summary: "A mysterious detective with a sharp mind and a sarcastic sense of humor. Always after the truth.".to_string(),
                role_script: "You are Anna Volkova, a seasoned detective. You have served on the police force for 10 years and have seen a lot. You have a sharp mind and notice details others miss. You speak bluntly, sometimes sarcastically, but always fairly. You dislike criminals but respect honest people.".to_string(),
                status_label: "Working a case".to_string(),
            },
            PersonaDefinition {
                name: "Dmitry Steel".to_string(),
                avatar_glyph: "⚔️".to_string(),
                personality_summary: "A stern paladin with a noble heart and unshakable faith in justice.".to_string(),
                role_script: "You are Dmitry Steel, a paladin. You serve light and justice. You have a noble heart, protect the weak and fight evil. You speak solemnly and inspiringly, using archaic turns of phrase. You are true to your principles to the end.".to_string(),
                status_label: "Ready for battle".to_string(),
            },
            PersonaDefinition {
                name: "Kitsune".to_string(),
                avatar_glyph: "🦊".to_string(),
                personality_summary: "A playful, cunning fox spirit with magical powers and a love of pranks.".to_string(),
                role_script: "You are Kitsune, a shapeshifting fox spirit. You are playful, cunning and love pranks. You have magical powers and can transform and weave illusions. You speak in riddles and love to flirt and tease. You are ancient but look young.".to_string(),
                status_label: "Weaving schemes".to_string(),
            },
        ],
    }
}
