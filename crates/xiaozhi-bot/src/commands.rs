//! Slash command definitions and option extraction.

use serenity::all::{CommandDataOption, CommandOptionType, CreateCommand, CreateCommandOption};
use xiaozhi_core::commands::{
    CHAT_COMMAND, CHAT_DESCRIPTION, CLEAR_COMMAND, CLEAR_DESCRIPTION, MESSAGE_DESCRIPTION,
    MESSAGE_OPTION,
};

/// Global commands registered on ready.
pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(CHAT_COMMAND)
            .description(CHAT_DESCRIPTION)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    MESSAGE_OPTION,
                    MESSAGE_DESCRIPTION,
                )
                .required(true),
            ),
        CreateCommand::new(CLEAR_COMMAND).description(CLEAR_DESCRIPTION),
    ]
}

/// The `message` option's text, or an empty string (which validation rejects).
pub fn message_option(options: &[CommandDataOption]) -> String {
    options
        .iter()
        .find(|o| o.name == MESSAGE_OPTION)
        .and_then(|o| o.value.as_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_option(name: &str, value: &str) -> CommandDataOption {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "type": 3,
            "value": value,
        }))
        .unwrap()
    }

    #[test]
    fn defines_chat_and_clear_commands() {
        let json = serde_json::to_value(definitions()).unwrap();
        assert_eq!(json[0]["name"], "小智");
        assert_eq!(json[0]["options"][0]["name"], "message");
        assert_eq!(json[0]["options"][0]["required"], true);
        assert_eq!(json[1]["name"], "清除記憶");
    }

    #[test]
    fn extracts_message_option() {
        let options = vec![
            string_option("other", "ignored"),
            string_option("message", "你好"),
        ];
        assert_eq!(message_option(&options), "你好");
    }

    #[test]
    fn missing_option_is_empty() {
        assert_eq!(message_option(&[]), "");
    }
}
