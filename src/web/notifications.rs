/// Notification feed, settings, and the JSON endpoints the client-side
/// poller consumes.
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::notifications::{self, NotificationFilter, NotificationStatus, TimePeriod};
use crate::orm::{notification_categories, notifications as notification_orm};
use crate::pagination::Page;
use actix_web::{get, post, web, HttpResponse, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use serde::Deserialize;
use std::collections::HashMap;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Literal paths must be registered ahead of /notifications/{id}.
    conf.service(unread_count)
        .service(latest)
        .service(latest_id)
        .service(view_settings)
        .service(update_settings)
        .service(mark_read)
        .service(mark_all_read)
        .service(delete_notification)
        .service(clear_all)
        .service(view_notifications)
        .service(view_notification);
}

pub struct NotificationDisplay {
    pub id: i32,
    pub title: String,
    pub message: String,
    pub category: String,
    pub link: String,
    pub is_unread: bool,
    pub created_at: chrono::NaiveDateTime,
}

fn display(
    n: notification_orm::Model,
    categories: &HashMap<i32, String>,
) -> NotificationDisplay {
    NotificationDisplay {
        id: n.id,
        title: n.title,
        message: n.message,
        category: n
            .category_id
            .and_then(|id| categories.get(&id).cloned())
            .unwrap_or_default(),
        link: n.link.unwrap_or_default(),
        is_unread: n.status == NotificationStatus::Unread.as_str(),
        created_at: n.created_at,
    }
}

async fn category_names() -> Result<HashMap<i32, String>, crate::Error> {
    Ok(notifications::all_categories(get_db_pool())
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect())
}

#[derive(Template)]
#[template(path = "notifications.html")]
struct NotificationsTemplate {
    client: ClientCtx,
    notifications: Page<NotificationDisplay>,
    categories: Vec<notification_categories::Model>,
    unread_count: u64,
    selected_category: String,
    selected_status: String,
    selected_time_period: String,
}

#[derive(Deserialize)]
struct FeedQuery {
    page: Option<u64>,
    per_page: Option<u64>,
    category: Option<String>,
    status: Option<String>,
    time_period: Option<String>,
}

#[get("/notifications")]
async fn view_notifications(
    client: ClientCtx,
    query: web::Query<FeedQuery>,
) -> Result<impl Responder, crate::Error> {
    let db = get_db_pool();
    let user = client.require_user()?;

    let filter = NotificationFilter {
        category_id: query
            .category
            .as_deref()
            .filter(|c| *c != "all")
            .and_then(|c| c.parse().ok()),
        status: query
            .status
            .as_deref()
            .and_then(NotificationStatus::from_str),
        time_period: query.time_period.as_deref().and_then(TimePeriod::from_str),
    };

    let page = notifications::list_filtered(
        db,
        user.id,
        &filter,
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(10),
    )
    .await?;
    let categories = notifications::all_categories(db).await?;
    let names: HashMap<i32, String> = categories.iter().map(|c| (c.id, c.name.clone())).collect();
    let unread = notifications::unread_count(db, user.id).await?;

    let items = page.items.into_iter().map(|n| display(n, &names)).collect();
    let page = Page {
        items,
        page: page.page,
        per_page: page.per_page,
        total_items: page.total_items,
        total_pages: page.total_pages,
    };

    Ok(NotificationsTemplate {
        client,
        notifications: page,
        categories,
        unread_count: unread,
        selected_category: query.category.clone().unwrap_or_default(),
        selected_status: query.status.clone().unwrap_or_default(),
        selected_time_period: query.time_period.clone().unwrap_or_default(),
    }
    .to_response())
}

/// GET /notifications/unread - poller endpoint.
#[get("/notifications/unread")]
async fn unread_count(client: ClientCtx) -> Result<impl Responder, crate::Error> {
    let user = client.require_user()?;
    let count = notifications::unread_count(get_db_pool(), user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "count": count })))
}

#[derive(Deserialize)]
struct LatestQuery {
    limit: Option<u64>,
}

/// GET /notifications/latest - most recent unread summaries for the dropdown.
#[get("/notifications/latest")]
async fn latest(
    client: ClientCtx,
    query: web::Query<LatestQuery>,
) -> Result<impl Responder, crate::Error> {
    let user = client.require_user()?;
    let names = category_names().await?;
    let latest =
        notifications::latest_unread(get_db_pool(), user.id, query.limit.unwrap_or(5)).await?;

    let summaries: Vec<serde_json::Value> = latest
        .into_iter()
        .map(|n| {
            serde_json::json!({
                "id": n.id,
                "title": n.title,
                "message": n.message,
                "category": n.category_id.and_then(|id| names.get(&id).cloned()),
                "created_at": n.created_at.format("%Y-%m-%d %H:%M").to_string(),
                "link": n.link,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({ "notifications": summaries })))
}

/// GET /notifications/latest_id - watermark for detecting new arrivals.
#[get("/notifications/latest_id")]
async fn latest_id(client: ClientCtx) -> Result<impl Responder, crate::Error> {
    let user = client.require_user()?;
    let id = notifications::latest_id(get_db_pool(), user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "latest_id": id })))
}

#[derive(Template)]
#[template(path = "notification_detail.html")]
struct NotificationDetailTemplate {
    client: ClientCtx,
    notification: NotificationDisplay,
}

/// Open a notification: mark it read, then follow its link if it has one.
#[get("/notifications/{id}")]
async fn view_notification(
    client: ClientCtx,
    id: web::Path<i32>,
) -> Result<impl Responder, crate::Error> {
    let user = client.require_user()?;
    let notification = notifications::mark_read(get_db_pool(), user.id, *id).await?;

    if let Some(link) = &notification.link {
        return Ok(super::redirect(link));
    }
    let names = category_names().await?;
    Ok(NotificationDetailTemplate {
        client,
        notification: display(notification, &names),
    }
    .to_response())
}

pub struct CategoryOption {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub subscribed: bool,
}

#[derive(Template)]
#[template(path = "notification_settings.html")]
struct SettingsTemplate {
    client: ClientCtx,
    email_enabled: bool,
    email_digest: bool,
    push_enabled: bool,
    categories: Vec<CategoryOption>,
}

#[get("/notifications/settings")]
async fn view_settings(client: ClientCtx) -> Result<impl Responder, crate::Error> {
    let db = get_db_pool();
    let user = client.require_user()?;
    let settings = notifications::get_or_create_settings(db, user).await?;
    let subscribed = notifications::subscribed_category_ids(db, &settings).await?;

    let categories = notifications::all_categories(db)
        .await?
        .into_iter()
        .map(|c| CategoryOption {
            subscribed: subscribed.contains(&c.id),
            id: c.id,
            name: c.name,
            description: c.description.unwrap_or_default(),
        })
        .collect();

    Ok(SettingsTemplate {
        client,
        email_enabled: settings.email_enabled,
        email_digest: settings.email_digest,
        push_enabled: settings.push_enabled,
        categories,
    }
    .to_response())
}

/// Settings form posts checkboxes and a repeated category_ids field, so the
/// body is read as raw pairs rather than a struct.
#[post("/notifications/settings")]
async fn update_settings(
    client: ClientCtx,
    form: web::Form<Vec<(String, String)>>,
) -> Result<impl Responder, crate::Error> {
    let db = get_db_pool();
    let user = client.require_user()?;
    let settings = notifications::get_or_create_settings(db, user).await?;

    let mut email_enabled = false;
    let mut email_digest = false;
    let mut push_enabled = false;
    let mut category_ids = Vec::new();
    for (key, value) in form.into_inner() {
        match key.as_str() {
            "email_enabled" => email_enabled = true,
            "email_digest" => email_digest = true,
            "push_enabled" => push_enabled = true,
            "category_ids" => {
                if let Ok(id) = value.trim().parse() {
                    category_ids.push(id);
                }
            }
            _ => {}
        }
    }

    let settings =
        notifications::update_settings_flags(db, settings, email_enabled, email_digest, push_enabled)
            .await?;
    notifications::update_subscriptions(db, &settings, &category_ids).await?;

    Ok(super::redirect("/notifications/settings"))
}

#[post("/notifications/mark_read/{id}")]
async fn mark_read(client: ClientCtx, id: web::Path<i32>) -> Result<impl Responder, crate::Error> {
    let user = client.require_user()?;
    notifications::mark_read(get_db_pool(), user.id, *id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

#[post("/notifications/mark_all_read")]
async fn mark_all_read(client: ClientCtx) -> Result<impl Responder, crate::Error> {
    let user = client.require_user()?;
    let count = notifications::mark_all_read(get_db_pool(), user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "count": count })))
}

#[post("/notifications/delete/{id}")]
async fn delete_notification(
    client: ClientCtx,
    id: web::Path<i32>,
) -> Result<impl Responder, crate::Error> {
    let user = client.require_user()?;
    notifications::delete_notification(get_db_pool(), user.id, *id).await?;
    Ok(super::redirect("/notifications"))
}

#[post("/notifications/clear_all")]
async fn clear_all(client: ClientCtx) -> Result<impl Responder, crate::Error> {
    let user = client.require_user()?;
    notifications::clear_all(get_db_pool(), user.id).await?;
    Ok(super::redirect("/notifications"))
}
