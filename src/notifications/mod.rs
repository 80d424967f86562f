//! Notification engine: synchronous fan-out of typed notifications as a side
//! effect of domain events, plus per-user read, query, and subscription
//! management.
//!
//! The engine only observes events; it never mutates posts or comments.
//! Factories are suppressed when the recipient would be notifying themselves
//! and tolerate a missing category by storing a null category reference.

pub mod types;

use crate::error::Result;
use crate::orm::{
    comments, notification_categories, notification_setting_categories, notification_settings,
    notifications, posts, users,
};
use crate::pagination::Page;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, ConnectionTrait, PaginatorTrait, TransactionTrait};
use std::collections::HashMap;

pub use types::{NotificationStatus, NotificationType, TimePeriod};

/// Starter categories seeded at startup.
pub const DEFAULT_CATEGORIES: [(&str, &str, &str); 4] = [
    (
        "Comments",
        "Notifications about comments on your posts",
        "fa-comment",
    ),
    (
        "Replies",
        "Notifications about replies to your comments",
        "fa-reply",
    ),
    (
        "Mentions",
        "Notifications when someone mentions you",
        "fa-at",
    ),
    ("System", "System notifications and announcements", "fa-bell"),
];

pub const APPROVAL_TITLE: &str = "Account Approved";
pub const APPROVAL_MESSAGE: &str =
    "Your account has been approved! You can now create posts and comments.";
pub const APPROVAL_LINK: &str = "/profile";

pub fn comment_anchor(post_id: i32, comment_id: i32) -> String {
    format!("/post/{}#comment-{}", post_id, comment_id)
}

/// Insert any of the starter categories that are missing.
pub async fn seed_default_categories<C: ConnectionTrait>(db: &C) -> Result<()> {
    for (name, description, icon) in DEFAULT_CATEGORIES {
        if find_category_by_name(db, name).await?.is_none() {
            notification_categories::ActiveModel {
                name: Set(name.to_owned()),
                description: Set(Some(description.to_owned())),
                icon: Set(Some(icon.to_owned())),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }
    Ok(())
}

pub async fn all_categories<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<notification_categories::Model>> {
    Ok(notification_categories::Entity::find()
        .order_by_asc(notification_categories::Column::Id)
        .all(db)
        .await?)
}

pub async fn find_category_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Option<notification_categories::Model>> {
    Ok(notification_categories::Entity::find()
        .filter(notification_categories::Column::Name.eq(name))
        .one(db)
        .await?)
}

struct NewNotification<'a> {
    user_id: i32,
    sender_id: Option<i32>,
    category_id: Option<i32>,
    post_id: Option<i32>,
    comment_id: Option<i32>,
    type_: NotificationType,
    title: &'a str,
    message: String,
    link: Option<String>,
}

async fn insert_notification<C: ConnectionTrait>(
    db: &C,
    new: NewNotification<'_>,
) -> Result<notifications::Model> {
    let notification = notifications::ActiveModel {
        user_id: Set(new.user_id),
        sender_id: Set(new.sender_id),
        category_id: Set(new.category_id),
        post_id: Set(new.post_id),
        comment_id: Set(new.comment_id),
        type_: Set(new.type_.as_str().to_owned()),
        title: Set(new.title.to_owned()),
        message: Set(new.message),
        link: Set(new.link),
        status: Set(NotificationStatus::Unread.as_str().to_owned()),
        created_at: Set(Utc::now().naive_utc()),
        read_at: Set(None),
        ..Default::default()
    };
    Ok(notification.insert(db).await?)
}

/// Notify a post's author that someone commented. Suppressed when the
/// commenter is the author.
pub async fn create_comment_notification<C: ConnectionTrait>(
    db: &C,
    post: &posts::Model,
    comment: &comments::Model,
    sender: &users::Model,
) -> Result<Option<notifications::Model>> {
    if sender.id == post.user_id {
        return Ok(None);
    }

    let category = find_category_by_name(db, "Comments").await?;
    let notification = insert_notification(
        db,
        NewNotification {
            user_id: post.user_id,
            sender_id: Some(sender.id),
            category_id: category.map(|c| c.id),
            post_id: Some(post.id),
            comment_id: Some(comment.id),
            type_: NotificationType::Comment,
            title: "New Comment",
            message: format!(
                "{} commented on your post '{}'",
                sender.username, post.title
            ),
            link: Some(comment_anchor(post.id, comment.id)),
        },
    )
    .await?;
    Ok(Some(notification))
}

/// Notify a comment's author that someone replied. Suppressed when the
/// replier is the comment's author.
pub async fn create_reply_notification<C: ConnectionTrait>(
    db: &C,
    parent: &comments::Model,
    reply: &comments::Model,
    sender: &users::Model,
) -> Result<Option<notifications::Model>> {
    if sender.id == parent.user_id {
        return Ok(None);
    }

    let category = find_category_by_name(db, "Replies").await?;
    let notification = insert_notification(
        db,
        NewNotification {
            user_id: parent.user_id,
            sender_id: Some(sender.id),
            category_id: category.map(|c| c.id),
            post_id: Some(parent.post_id),
            comment_id: Some(reply.id),
            type_: NotificationType::Reply,
            title: "New Reply",
            message: format!("{} replied to your comment", sender.username),
            link: Some(comment_anchor(parent.post_id, reply.id)),
        },
    )
    .await?;
    Ok(Some(notification))
}

/// Broadcast a system notification to a set of users, one row per recipient,
/// in a single transaction.
pub async fn create_system_notification<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    recipients: &[users::Model],
    message: &str,
    link: Option<&str>,
    title: &str,
) -> Result<Vec<notifications::Model>> {
    let txn = db.begin().await?;
    let category_id = find_category_by_name(&txn, "System").await?.map(|c| c.id);

    let mut created = Vec::with_capacity(recipients.len());
    for user in recipients {
        let notification = insert_notification(
            &txn,
            NewNotification {
                user_id: user.id,
                sender_id: None,
                category_id,
                post_id: None,
                comment_id: None,
                type_: NotificationType::System,
                title,
                message: message.to_owned(),
                link: link.map(str::to_owned),
            },
        )
        .await?;
        created.push(notification);
    }

    txn.commit().await?;
    Ok(created)
}

/// Tell a user their account was approved.
pub async fn create_approval_notification<C: ConnectionTrait>(
    db: &C,
    user: &users::Model,
) -> Result<notifications::Model> {
    let category = find_category_by_name(db, "System").await?;
    insert_notification(
        db,
        NewNotification {
            user_id: user.id,
            sender_id: None,
            category_id: category.map(|c| c.id),
            post_id: None,
            comment_id: None,
            type_: NotificationType::UserApproval,
            title: APPROVAL_TITLE,
            message: APPROVAL_MESSAGE.to_owned(),
            link: Some(APPROVAL_LINK.to_owned()),
        },
    )
    .await
}

pub async fn unread_count<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<u64> {
    Ok(notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(user_id))
        .filter(notifications::Column::Status.eq(NotificationStatus::Unread.as_str()))
        .count(db)
        .await?)
}

/// Most recent unread notifications, newest first, bounded to `limit`.
pub async fn latest_unread<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    limit: u64,
) -> Result<Vec<notifications::Model>> {
    Ok(notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(user_id))
        .filter(notifications::Column::Status.eq(NotificationStatus::Unread.as_str()))
        .order_by_desc(notifications::Column::CreatedAt)
        .order_by_desc(notifications::Column::Id)
        .limit(limit)
        .all(db)
        .await?)
}

/// Watermark for the client-side poller: the highest notification id for the
/// user regardless of read state, or 0 when none exist.
pub async fn latest_id<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<i32> {
    let latest = notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(user_id))
        .order_by_desc(notifications::Column::Id)
        .one(db)
        .await?;
    Ok(latest.map(|n| n.id).unwrap_or(0))
}

#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub category_id: Option<i32>,
    pub status: Option<NotificationStatus>,
    pub time_period: Option<TimePeriod>,
}

/// Filtered, paginated listing, newest first.
pub async fn list_filtered<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    filter: &NotificationFilter,
    page: u64,
    per_page: u64,
) -> Result<Page<notifications::Model>> {
    let mut query = notifications::Entity::find().filter(notifications::Column::UserId.eq(user_id));

    if let Some(category_id) = filter.category_id {
        query = query.filter(notifications::Column::CategoryId.eq(category_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(notifications::Column::Status.eq(status.as_str()));
    }
    if let Some(period) = filter.time_period {
        let cutoff = period.cutoff(Utc::now().naive_utc());
        query = query.filter(notifications::Column::CreatedAt.gte(cutoff));
    }

    let paginator = query
        .order_by_desc(notifications::Column::CreatedAt)
        .order_by_desc(notifications::Column::Id)
        .paginate(db, per_page.max(1));
    let total_items = paginator.num_items().await?;
    let items = paginator.fetch_page(page.max(1) - 1).await?;
    Ok(Page::new(items, page, per_page, total_items))
}

pub async fn find_owned<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    notification_id: i32,
) -> Result<notifications::Model> {
    notifications::Entity::find_by_id(notification_id)
        .filter(notifications::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(crate::Error::NotFound("notification"))
}

/// Mark one notification as read. Idempotent: a second call leaves the
/// original `read_at` untouched.
pub async fn mark_read<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    notification_id: i32,
) -> Result<notifications::Model> {
    let notification = find_owned(db, user_id, notification_id).await?;
    if notification.status == NotificationStatus::Read.as_str() {
        return Ok(notification);
    }

    let mut active: notifications::ActiveModel = notification.into();
    active.status = Set(NotificationStatus::Read.as_str().to_owned());
    active.read_at = Set(Some(Utc::now().naive_utc()));
    Ok(active.update(db).await?)
}

/// Mark every unread notification for a user as read. A single UPDATE, so
/// the caller never observes a partially flipped state. Returns the number
/// of notifications that changed.
pub async fn mark_all_read<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<u64> {
    let result = notifications::Entity::update_many()
        .col_expr(
            notifications::Column::Status,
            Expr::value(NotificationStatus::Read.as_str()),
        )
        .col_expr(
            notifications::Column::ReadAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(notifications::Column::UserId.eq(user_id))
        .filter(notifications::Column::Status.eq(NotificationStatus::Unread.as_str()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Hard delete.
pub async fn delete_notification<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    notification_id: i32,
) -> Result<()> {
    let notification = find_owned(db, user_id, notification_id).await?;
    notification.delete(db).await?;
    Ok(())
}

/// Hard delete everything in a user's feed.
pub async fn clear_all<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<()> {
    notifications::Entity::delete_many()
        .filter(notifications::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

/// One broadcast as shown in the admin history view: notifications sharing
/// identical (title, message, link) collapse into a group.
#[derive(Debug, Clone)]
pub struct NotificationGroup {
    /// The most recent member, used as the display representative.
    pub notification: notifications::Model,
    pub count: u64,
    pub latest_timestamp: sea_orm::prelude::DateTime,
}

/// Read-time aggregation of system notifications for the broadcast history
/// view. Groups are recomputed on every call and sorted by their latest
/// timestamp; pagination applies to the groups, so the offset math is manual.
pub async fn grouped_system_notifications<C: ConnectionTrait>(
    db: &C,
    page: u64,
    per_page: u64,
) -> Result<Page<NotificationGroup>> {
    let all = notifications::Entity::find()
        .filter(notifications::Column::Type.eq(NotificationType::System.as_str()))
        .order_by_desc(notifications::Column::CreatedAt)
        .order_by_desc(notifications::Column::Id)
        .all(db)
        .await?;

    let mut groups: Vec<NotificationGroup> = Vec::new();
    let mut index: HashMap<(String, String, Option<String>), usize> = HashMap::new();
    for notification in all {
        let key = (
            notification.title.clone(),
            notification.message.clone(),
            notification.link.clone(),
        );
        match index.get(&key) {
            Some(&i) => {
                groups[i].count += 1;
                if notification.created_at > groups[i].latest_timestamp {
                    groups[i].latest_timestamp = notification.created_at;
                }
            }
            None => {
                index.insert(key, groups.len());
                groups.push(NotificationGroup {
                    latest_timestamp: notification.created_at,
                    count: 1,
                    notification,
                });
            }
        }
    }
    groups.sort_by(|a, b| b.latest_timestamp.cmp(&a.latest_timestamp));

    let total_items = groups.len() as u64;
    let per_page_clamped = per_page.max(1) as usize;
    let start = (page.max(1) as usize - 1) * per_page_clamped;
    let items: Vec<NotificationGroup> = groups
        .into_iter()
        .skip(start)
        .take(per_page_clamped)
        .collect();
    Ok(Page::new(items, page, per_page, total_items))
}

/// Back-fill null category references from the notification type. The match
/// is exhaustive over the closed type set; types without a seeded category
/// are left as-is. Returns the number of rows updated.
pub async fn fix_missing_categories<C: ConnectionTrait>(db: &C) -> Result<u64> {
    let comments_cat = find_category_by_name(db, "Comments").await?;
    let replies_cat = find_category_by_name(db, "Replies").await?;
    let mentions_cat = find_category_by_name(db, "Mentions").await?;
    let system_cat = find_category_by_name(db, "System").await?;

    let orphans = notifications::Entity::find()
        .filter(notifications::Column::CategoryId.is_null())
        .all(db)
        .await?;

    let mut updated = 0;
    for notification in orphans {
        let category = match NotificationType::from_str(&notification.type_) {
            Some(NotificationType::Comment) => comments_cat.as_ref(),
            Some(NotificationType::Reply) => replies_cat.as_ref(),
            Some(NotificationType::Mention) => mentions_cat.as_ref(),
            Some(NotificationType::System) | Some(NotificationType::UserApproval) => {
                system_cat.as_ref()
            }
            Some(NotificationType::PostUpdate) | Some(NotificationType::Like) | None => None,
        };
        if let Some(category) = category {
            let mut active: notifications::ActiveModel = notification.into();
            active.category_id = Set(Some(category.id));
            active.update(db).await?;
            updated += 1;
        }
    }
    Ok(updated)
}

/// Fetch a user's notification settings, materializing the defaults on first
/// access: all delivery flags at their defaults and a subscription to every
/// category that exists right now.
pub async fn get_or_create_settings<C: ConnectionTrait>(
    db: &C,
    user: &users::Model,
) -> Result<notification_settings::Model> {
    let existing = notification_settings::Entity::find()
        .filter(notification_settings::Column::UserId.eq(user.id))
        .one(db)
        .await?;
    if let Some(settings) = existing {
        return Ok(settings);
    }

    let now = Utc::now().naive_utc();
    let settings = notification_settings::ActiveModel {
        user_id: Set(user.id),
        email_enabled: Set(true),
        email_digest: Set(false),
        push_enabled: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for category in all_categories(db).await? {
        notification_setting_categories::Entity::insert(
            notification_setting_categories::ActiveModel {
                settings_id: Set(settings.id),
                category_id: Set(category.id),
            },
        )
        .exec_without_returning(db)
        .await?;
    }

    Ok(settings)
}

pub async fn subscribed_category_ids<C: ConnectionTrait>(
    db: &C,
    settings: &notification_settings::Model,
) -> Result<Vec<i32>> {
    Ok(notification_setting_categories::Entity::find()
        .filter(notification_setting_categories::Column::SettingsId.eq(settings.id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.category_id)
        .collect())
}

/// Replace the subscribed-category set. Ids that do not resolve to an
/// existing category are dropped.
pub async fn update_subscriptions<C: ConnectionTrait>(
    db: &C,
    settings: &notification_settings::Model,
    category_ids: &[i32],
) -> Result<()> {
    notification_setting_categories::Entity::delete_many()
        .filter(notification_setting_categories::Column::SettingsId.eq(settings.id))
        .exec(db)
        .await?;

    if category_ids.is_empty() {
        return Ok(());
    }
    let valid = notification_categories::Entity::find()
        .filter(notification_categories::Column::Id.is_in(category_ids.to_vec()))
        .all(db)
        .await?;
    for category in valid {
        notification_setting_categories::Entity::insert(
            notification_setting_categories::ActiveModel {
                settings_id: Set(settings.id),
                category_id: Set(category.id),
            },
        )
        .exec_without_returning(db)
        .await?;
    }
    Ok(())
}

/// Update the delivery flags. The email flags are persisted but no sender
/// consumes them.
pub async fn update_settings_flags<C: ConnectionTrait>(
    db: &C,
    settings: notification_settings::Model,
    email_enabled: bool,
    email_digest: bool,
    push_enabled: bool,
) -> Result<notification_settings::Model> {
    let mut active: notification_settings::ActiveModel = settings.into();
    active.email_enabled = Set(email_enabled);
    active.email_digest = Set(email_digest);
    active.push_enabled = Set(push_enabled);
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

/// Whether a user's (possibly just-materialized) settings subscribe to the
/// given category.
pub async fn is_subscribed_to<C: ConnectionTrait>(
    db: &C,
    user: &users::Model,
    category_id: i32,
) -> Result<bool> {
    let settings = get_or_create_settings(db, user).await?;
    let row = notification_setting_categories::Entity::find_by_id((settings.id, category_id))
        .one(db)
        .await?;
    Ok(row.is_some())
}
