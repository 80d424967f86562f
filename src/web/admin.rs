/// Admin panel: user approval queue, role management, system broadcasts.
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::notifications::{self, NotificationGroup};
use crate::orm::users;
use crate::pagination::Page;
use crate::user;
use actix_web::{get, post, web, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_dashboard)
        .service(view_users)
        .service(view_pending_users)
        .service(approve_user)
        .service(delete_user)
        .service(toggle_role)
        .service(view_compose_notification)
        .service(send_system_notification)
        .service(view_system_notifications)
        .service(fix_categories);
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
struct DashboardTemplate {
    client: ClientCtx,
    user_count: u64,
    post_count: u64,
    pending_count: u64,
}

#[get("/admin")]
async fn view_dashboard(client: ClientCtx) -> Result<impl Responder, crate::Error> {
    client.require_admin()?;
    let db = get_db_pool();
    Ok(DashboardTemplate {
        user_count: user::count_users(db).await?,
        post_count: crate::posts::count_posts(db).await?,
        pending_count: user::count_pending(db).await?,
        client,
    }
    .to_response())
}

#[derive(Template)]
#[template(path = "admin/users.html")]
struct UsersTemplate {
    client: ClientCtx,
    users: Vec<users::Model>,
}

#[get("/admin/users")]
async fn view_users(client: ClientCtx) -> Result<impl Responder, crate::Error> {
    client.require_admin()?;
    let users = user::all_users(get_db_pool()).await?;
    Ok(UsersTemplate { client, users }.to_response())
}

#[derive(Template)]
#[template(path = "admin/pending_users.html")]
struct PendingUsersTemplate {
    client: ClientCtx,
    users: Vec<users::Model>,
}

#[get("/admin/pending_users")]
async fn view_pending_users(client: ClientCtx) -> Result<impl Responder, crate::Error> {
    client.require_admin()?;
    let users = user::pending_users(get_db_pool()).await?;
    Ok(PendingUsersTemplate { client, users }.to_response())
}

#[post("/admin/user/{id}/approve")]
async fn approve_user(client: ClientCtx, id: web::Path<i32>) -> Result<impl Responder, crate::Error> {
    let admin = client.require_admin()?;
    user::approve(get_db_pool(), admin, *id).await?;
    Ok(super::redirect("/admin/pending_users"))
}

#[post("/admin/user/{id}/delete")]
async fn delete_user(client: ClientCtx, id: web::Path<i32>) -> Result<impl Responder, crate::Error> {
    let admin = client.require_admin()?;
    user::delete_user(get_db_pool(), admin, *id).await?;
    Ok(super::redirect("/admin/users"))
}

#[post("/admin/user/{id}/toggle-role")]
async fn toggle_role(client: ClientCtx, id: web::Path<i32>) -> Result<impl Responder, crate::Error> {
    let admin = client.require_admin()?;
    user::toggle_role(get_db_pool(), admin, *id).await?;
    Ok(super::redirect("/admin/users"))
}

#[derive(Template)]
#[template(path = "admin/create_notification.html")]
struct ComposeTemplate {
    client: ClientCtx,
    error: String,
    title_value: String,
    message_value: String,
    link_value: String,
}

#[derive(Deserialize, Validate)]
struct SystemNotificationForm {
    #[validate(length(min = 3, max = 100, message = "Title must be 3-100 characters."))]
    title: String,
    #[validate(length(min = 10, max = 500, message = "Message must be 10-500 characters."))]
    message: String,
    #[validate(length(max = 255, message = "Link cannot be longer than 255 characters."))]
    link: Option<String>,
}

#[get("/admin/system-notification")]
async fn view_compose_notification(client: ClientCtx) -> Result<impl Responder, crate::Error> {
    client.require_admin()?;
    Ok(ComposeTemplate {
        client,
        error: String::new(),
        title_value: String::new(),
        message_value: String::new(),
        link_value: String::new(),
    }
    .to_response())
}

/// Broadcast to every approved user.
#[post("/admin/system-notification")]
async fn send_system_notification(
    client: ClientCtx,
    form: web::Form<SystemNotificationForm>,
) -> Result<impl Responder, crate::Error> {
    client.require_admin()?;
    let db = get_db_pool();
    let form = form.into_inner();

    if let Err(errors) = form.validate() {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .filter_map(|err| err.message.as_ref())
            .map(|msg| msg.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        return Ok(ComposeTemplate {
            client,
            error: message,
            title_value: form.title,
            message_value: form.message,
            link_value: form.link.unwrap_or_default(),
        }
        .to_response());
    }

    let recipients = user::approved_users(db).await?;
    let link = form.link.as_deref().map(str::trim).filter(|l| !l.is_empty());
    let created =
        notifications::create_system_notification(db, &recipients, &form.message, link, &form.title)
            .await?;
    log::info!("system notification sent to {} users", created.len());

    Ok(super::redirect("/admin"))
}

#[derive(Template)]
#[template(path = "admin/system_notifications.html")]
struct BroadcastHistoryTemplate {
    client: ClientCtx,
    groups: Page<NotificationGroup>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    page: Option<u64>,
}

pub const GROUPS_PER_PAGE: u64 = 10;

#[get("/admin/system-notifications")]
async fn view_system_notifications(
    client: ClientCtx,
    query: web::Query<HistoryQuery>,
) -> Result<impl Responder, crate::Error> {
    client.require_admin()?;
    let groups = notifications::grouped_system_notifications(
        get_db_pool(),
        query.page.unwrap_or(1),
        GROUPS_PER_PAGE,
    )
    .await?;
    Ok(BroadcastHistoryTemplate { client, groups }.to_response())
}

/// Back-fill notifications that predate category assignment.
#[post("/admin/fix_categories")]
async fn fix_categories(client: ClientCtx) -> Result<impl Responder, crate::Error> {
    client.require_admin()?;
    let updated = notifications::fix_missing_categories(get_db_pool()).await?;
    log::info!("back-filled categories on {} notifications", updated);
    Ok(super::redirect("/notifications"))
}
