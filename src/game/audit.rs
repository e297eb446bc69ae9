//! Audit trail of committed mutations.
//!
//! Sinks are fire-and-forget: recording never fails and never blocks the
//! operation that produced the entry.

use serde::Serialize;
use tracing::{error, info};

use crate::utils::html_escape;

/// Something worth an administrator's attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEntry {
    Gift {
        from: u64,
        to: u64,
        character_id: String,
        character_name: String,
    },
    Transfer {
        by: u64,
        from: u64,
        to: u64,
        moved: usize,
    },
    Favorite {
        user: u64,
        character_id: String,
    },
    Payment {
        from: u64,
        to: u64,
        amount: i64,
    },
    Claim {
        user: u64,
        character_id: String,
        rarity: String,
        streak: u32,
    },
    Explore {
        user: u64,
        coins: i64,
    },
    Reset {
        by: u64,
        target: u64,
    },
    /// Two half-steps did not both complete; needs manual reconciliation.
    Inconsistency {
        operation: String,
        detail: String,
    },
}

impl AuditEntry {
    pub fn is_inconsistency(&self) -> bool {
        matches!(self, AuditEntry::Inconsistency { .. })
    }

    /// HTML text for the log channel.
    pub fn render(&self) -> String {
        match self {
            AuditEntry::Gift {
                from,
                to,
                character_id,
                character_name,
            } => format!(
                "🎁 <b>Gift</b>\n<code>{}</code> → <code>{}</code>\n{} [<code>{}</code>]",
                from,
                to,
                html_escape(character_name),
                html_escape(character_id)
            ),
            AuditEntry::Transfer { by, from, to, moved } => format!(
                "📦 <b>Transfer</b> by <code>{}</code>\n<code>{}</code> → <code>{}</code>: {} character(s)",
                by, from, to, moved
            ),
            AuditEntry::Favorite { user, character_id } => format!(
                "💖 <b>Favorite</b> <code>{}</code> → <code>{}</code>",
                user,
                html_escape(character_id)
            ),
            AuditEntry::Payment { from, to, amount } => format!(
                "💸 <b>Payment</b>\n<code>{}</code> → <code>{}</code>: {} coins",
                from, to, amount
            ),
            AuditEntry::Claim {
                user,
                character_id,
                rarity,
                streak,
            } => format!(
                "🌸 <b>Claim</b> <code>{}</code> got <code>{}</code> ({}), streak {}",
                user,
                html_escape(character_id),
                rarity,
                streak
            ),
            AuditEntry::Explore { user, coins } => format!(
                "🧭 <b>Explore</b> <code>{}</code> found {} coins",
                user, coins
            ),
            AuditEntry::Reset { by, target } => format!(
                "🗑 <b>Reset</b> <code>{}</code> wiped <code>{}</code>",
                by, target
            ),
            AuditEntry::Inconsistency { operation, detail } => format!(
                "⚠️ <b>Needs reconciliation</b> ({})\n{}",
                html_escape(operation),
                html_escape(detail)
            ),
        }
    }
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Writes entries to the application log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&self, entry: AuditEntry) {
        log_entry(&entry);
    }
}

/// Log an entry as JSON; inconsistencies at error level.
pub fn log_entry(entry: &AuditEntry) {
    let json = serde_json::to_string(entry).unwrap_or_else(|_| format!("{:?}", entry));
    if entry.is_inconsistency() {
        error!(audit = %json, "Inventory inconsistency recorded");
    } else {
        info!(audit = %json, "Audit");
    }
}

#[cfg(test)]
pub mod recording {
    use parking_lot::Mutex;

    use super::{AuditEntry, AuditSink};

    /// Keeps entries for assertions.
    #[derive(Default)]
    pub struct RecordingAudit {
        entries: Mutex<Vec<AuditEntry>>,
    }

    impl RecordingAudit {
        pub fn entries(&self) -> Vec<AuditEntry> {
            self.entries.lock().clone()
        }

        pub fn inconsistencies(&self) -> usize {
            self.entries.lock().iter().filter(|e| e.is_inconsistency()).count()
        }
    }

    impl AuditSink for RecordingAudit {
        fn record(&self, entry: AuditEntry) {
            self.entries.lock().push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escapes_names() {
        let entry = AuditEntry::Gift {
            from: 1,
            to: 2,
            character_id: "c1".to_string(),
            character_name: "<Rem>".to_string(),
        };
        assert!(entry.render().contains("&lt;Rem&gt;"));
    }

    #[test]
    fn test_serializes_with_event_tag() {
        let entry = AuditEntry::Payment { from: 1, to: 2, amount: 500 };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"], "payment");
        assert_eq!(json["amount"], 500);
    }
}
