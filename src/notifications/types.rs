//! Notification type definitions

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Closed set of notification types. Stored as a string column but only ever
/// branched on through this enum so matches stay exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    Comment,      // Someone commented on your post
    Reply,        // Someone replied to your comment
    Mention,      // Someone mentioned you in a post or comment
    PostUpdate,   // Post you follow was updated
    Like,         // Someone liked your post or comment
    System,       // Announcements and other system notifications
    UserApproval, // Account approved by an admin
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Reply => "reply",
            Self::Mention => "mention",
            Self::PostUpdate => "post_update",
            Self::Like => "like",
            Self::System => "system",
            Self::UserApproval => "user_approval",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "comment" => Some(Self::Comment),
            "reply" => Some(Self::Reply),
            "mention" => Some(Self::Mention),
            "post_update" => Some(Self::PostUpdate),
            "like" => Some(Self::Like),
            "system" => Some(Self::System),
            "user_approval" => Some(Self::UserApproval),
            _ => None,
        }
    }
}

/// Read state. Transitions unread -> read exactly once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationStatus {
    Unread,
    Read,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Read => "read",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unread" => Some(Self::Unread),
            "read" => Some(Self::Read),
            _ => None,
        }
    }
}

/// Relative time window for filtered listings. Computed against "now" at
/// query time; results are not reproducible across calendar boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePeriod {
    Today,
    Week,
    Month,
}

impl TimePeriod {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "today" => Some(Self::Today),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            _ => None,
        }
    }

    /// Earliest `created_at` the window includes.
    pub fn cutoff(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self {
            Self::Today => now.date().and_time(NaiveTime::MIN),
            Self::Week => now - Duration::days(7),
            Self::Month => now - Duration::days(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_round_trip() {
        for t in [
            NotificationType::Comment,
            NotificationType::Reply,
            NotificationType::Mention,
            NotificationType::PostUpdate,
            NotificationType::Like,
            NotificationType::System,
            NotificationType::UserApproval,
        ] {
            assert_eq!(NotificationType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(NotificationType::from_str("bogus"), None);
    }

    #[test]
    fn today_cutoff_is_midnight() {
        let now = NaiveDateTime::parse_from_str("2024-05-02 13:45:00", "%Y-%m-%d %H:%M:%S")
            .expect("valid datetime");
        let cutoff = TimePeriod::Today.cutoff(now);
        assert_eq!(cutoff.to_string(), "2024-05-02 00:00:00");
    }
}
