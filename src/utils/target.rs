//! Target resolution for commands aimed at another user.
//!
//! A target is taken from the replied-to message first, then from a
//! numeric user id argument.

use teloxide::types::{Message, User};

use crate::game::Participant;

pub fn participant_from_user(user: &User) -> Participant {
    Participant {
        id: user.id.0,
        name: user.first_name.clone(),
        is_bot: user.is_bot,
    }
}

/// Parse a positive user id argument.
pub fn parse_user_id(arg: &str) -> Option<u64> {
    arg.trim().parse::<u64>().ok().filter(|id| *id != 0)
}

/// Resolve the target of `msg`.
///
/// `arg` is the command argument to try as a user id when the message is
/// not a reply.
pub fn target_from_msg(msg: &Message, arg: Option<&str>) -> Option<Participant> {
    if let Some(reply) = msg.reply_to_message()
        && let Some(user) = &reply.from
    {
        return Some(participant_from_user(user));
    }

    let id = parse_user_id(arg?)?;
    Some(Participant {
        id,
        name: format!("User {}", id),
        is_bot: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_id() {
        assert_eq!(parse_user_id(" 12345 "), Some(12345));
        assert_eq!(parse_user_id("0"), None);
        assert_eq!(parse_user_id("-5"), None);
        assert_eq!(parse_user_id("@someone"), None);
    }
}
