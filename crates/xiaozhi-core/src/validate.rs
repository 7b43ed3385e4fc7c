//! Inbound message checks applied before any history or API interaction.

use crate::error::InputError;

/// Longest accepted message, in characters (Discord's own message cap).
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Reject empty, whitespace-only and over-long messages.
pub fn validate_message(message: &str) -> Result<(), InputError> {
    if message.trim().is_empty() {
        return Err(InputError::Empty);
    }
    let len = message.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(InputError::TooLong {
            len,
            max: MAX_MESSAGE_CHARS,
        });
    }
    Ok(())
}
