//! Audit sink forwarding entries to a Telegram log channel.

use teloxide::prelude::*;
use teloxide::types::{ChatId, LinkPreviewOptions, ParseMode};
use tracing::warn;

use super::dispatcher::ThrottledBot;
use crate::game::audit::{log_entry, AuditEntry, AuditSink};

/// Logs every entry and posts it to the log channel in the background.
///
/// Sending never blocks or fails the operation that produced the entry.
#[derive(Clone)]
pub struct ChannelAudit {
    bot: ThrottledBot,
    channel: ChatId,
}

impl ChannelAudit {
    pub fn new(bot: ThrottledBot, channel_id: i64) -> Self {
        Self {
            bot,
            channel: ChatId(channel_id),
        }
    }
}

impl AuditSink for ChannelAudit {
    fn record(&self, entry: AuditEntry) {
        log_entry(&entry);

        let bot = self.bot.clone();
        let channel = self.channel;
        tokio::spawn(async move {
            let sent = bot
                .send_message(channel, entry.render())
                .parse_mode(ParseMode::Html)
                .link_preview_options(LinkPreviewOptions {
                    is_disabled: true,
                    url: None,
                    prefer_small_media: false,
                    prefer_large_media: false,
                    show_above_text: false,
                })
                .await;
            if let Err(e) = sent {
                warn!("Failed to post audit entry to {}: {}", channel, e);
            }
        });
    }
}
