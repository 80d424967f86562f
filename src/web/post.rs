use crate::comments;
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::posts;
use actix_web::{get, post, web, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use futures::future::LocalBoxFuture;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::collections::HashMap;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_new_post)
        .service(create_post)
        .service(view_post)
        .service(post_comment)
        .service(reply_to_comment)
        .service(view_update_post)
        .service(update_post)
        .service(delete_post)
        .service(toggle_visibility)
        .service(delete_comment);
}

/// One comment flattened for rendering, with its computed nesting depth.
pub struct CommentDisplay {
    pub id: i32,
    pub content: String,
    pub author: String,
    pub user_id: i32,
    pub depth: usize,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Template)]
#[template(path = "post.html")]
struct PostTemplate {
    client: ClientCtx,
    post: posts::Model,
    author: String,
    comments: Vec<CommentDisplay>,
}

#[derive(Template)]
#[template(path = "restricted_content.html")]
struct RestrictedTemplate {
    client: ClientCtx,
    title: String,
    preview: String,
}

#[derive(Template)]
#[template(path = "create_post.html")]
struct PostFormTemplate {
    client: ClientCtx,
    legend: String,
    action: String,
    error: String,
    /// Preserved form input.
    title_value: String,
    content_value: String,
}

#[derive(Deserialize)]
struct PostForm {
    title: String,
    content: String,
}

#[derive(Deserialize)]
struct CommentForm {
    content: String,
    /// Present (and possibly empty) only on reply forms.
    parent_id: Option<String>,
}

impl CommentForm {
    fn parent_id(&self) -> Option<i32> {
        self.parent_id
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
    }
}

fn descend<'a>(
    db: &'a DatabaseConnection,
    comment_id: i32,
    depth: usize,
    authors: &'a HashMap<i32, String>,
    out: &'a mut Vec<CommentDisplay>,
) -> LocalBoxFuture<'a, Result<(), crate::Error>> {
    Box::pin(async move {
        for reply in comments::direct_replies(db, comment_id).await? {
            let id = reply.id;
            out.push(CommentDisplay {
                id: reply.id,
                content: reply.content,
                author: authors
                    .get(&reply.user_id)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_owned()),
                user_id: reply.user_id,
                depth,
                created_at: reply.created_at,
            });
            descend(db, id, depth + 1, authors, out).await?;
        }
        Ok(())
    })
}

/// Flatten a post's comment forest in display order: top-level newest first,
/// each followed by its subtree in pre-order.
async fn comment_displays(
    db: &DatabaseConnection,
    post_id: i32,
) -> Result<Vec<CommentDisplay>, crate::Error> {
    let top_level = comments::list_top_level(db, post_id).await?;

    let mut author_ids: Vec<i32> = top_level.iter().map(|c| c.user_id).collect();
    for comment in &top_level {
        for reply in comments::get_all_replies(db, comment).await? {
            author_ids.push(reply.user_id);
        }
    }
    let authors = super::username_map(db, author_ids).await?;

    let mut out = Vec::new();
    for comment in top_level {
        let id = comment.id;
        out.push(CommentDisplay {
            id: comment.id,
            content: comment.content,
            author: authors
                .get(&comment.user_id)
                .cloned()
                .unwrap_or_else(|| "unknown".to_owned()),
            user_id: comment.user_id,
            depth: 0,
            created_at: comment.created_at,
        });
        descend(db, id, 1, &authors, &mut out).await?;
    }
    Ok(out)
}

#[get("/post/new")]
async fn view_new_post(client: ClientCtx) -> Result<impl Responder, crate::Error> {
    client.require_user()?;
    Ok(PostFormTemplate {
        client,
        legend: "New Post".to_owned(),
        action: "/post/new".to_owned(),
        error: String::new(),
        title_value: String::new(),
        content_value: String::new(),
    }
    .to_response())
}

#[post("/post/new")]
async fn create_post(
    client: ClientCtx,
    form: web::Form<PostForm>,
) -> Result<impl Responder, crate::Error> {
    let user = client.require_user()?.clone();
    let form = form.into_inner();

    match crate::posts::create_post(get_db_pool(), &user, &form.title, &form.content).await {
        Ok(post) => Ok(super::redirect(&format!("/post/{}", post.id))),
        Err(crate::Error::Validation(message)) => Ok(PostFormTemplate {
            client,
            legend: "New Post".to_owned(),
            action: "/post/new".to_owned(),
            error: message,
            title_value: form.title,
            content_value: form.content,
        }
        .to_response()),
        Err(other) => Err(other),
    }
}

#[get("/post/{id}")]
async fn view_post(client: ClientCtx, id: web::Path<i32>) -> Result<impl Responder, crate::Error> {
    let db = get_db_pool();
    let post = crate::posts::find_visible(db, client.get_user(), *id).await?;

    // Guests get a teaser, not the content.
    if !client.is_user() {
        let preview: String = post.content.chars().take(150).collect();
        return Ok(RestrictedTemplate {
            client,
            title: post.title,
            preview,
        }
        .to_response());
    }

    let author = crate::user::find_user(db, post.user_id).await?.username;
    let comments = comment_displays(db, post.id).await?;

    Ok(PostTemplate {
        client,
        post,
        author,
        comments,
    }
    .to_response())
}

#[post("/post/{id}")]
async fn post_comment(
    client: ClientCtx,
    id: web::Path<i32>,
    form: web::Form<CommentForm>,
) -> Result<impl Responder, crate::Error> {
    let db = get_db_pool();
    let user = client.require_user()?;
    let post = crate::posts::find_visible(db, Some(user), *id).await?;

    comments::post_comment(db, user, &post, &form.content, form.parent_id()).await?;
    Ok(super::redirect(&format!("/post/{}", post.id)))
}

/// Reply to a comment at any level of nesting.
#[post("/comment/{id}/reply")]
async fn reply_to_comment(
    client: ClientCtx,
    id: web::Path<i32>,
    form: web::Form<CommentForm>,
) -> Result<impl Responder, crate::Error> {
    let db = get_db_pool();
    let user = client.require_user()?;
    let parent = comments::find_comment(db, *id).await?;
    let post = crate::posts::find_visible(db, Some(user), parent.post_id).await?;

    comments::post_comment(db, user, &post, &form.content, Some(parent.id)).await?;
    Ok(super::redirect(&format!("/post/{}", post.id)))
}

#[get("/post/{id}/update")]
async fn view_update_post(
    client: ClientCtx,
    id: web::Path<i32>,
) -> Result<impl Responder, crate::Error> {
    let user = client.require_user()?.clone();
    let post = crate::posts::find_visible(get_db_pool(), Some(&user), *id).await?;
    if !client.can_moderate(post.user_id) {
        return Err(crate::Error::Unauthorized(
            "You may not modify someone else's post.".to_owned(),
        ));
    }

    Ok(PostFormTemplate {
        client,
        legend: "Update Post".to_owned(),
        action: format!("/post/{}/update", post.id),
        error: String::new(),
        title_value: post.title,
        content_value: post.content,
    }
    .to_response())
}

#[post("/post/{id}/update")]
async fn update_post(
    client: ClientCtx,
    id: web::Path<i32>,
    form: web::Form<PostForm>,
) -> Result<impl Responder, crate::Error> {
    let db = get_db_pool();
    let user = client.require_user()?.clone();
    let post = crate::posts::find_visible(db, Some(&user), *id).await?;
    let post_id = post.id;
    let form = form.into_inner();

    match crate::posts::update_post(db, &user, post, &form.title, &form.content).await {
        Ok(post) => Ok(super::redirect(&format!("/post/{}", post.id))),
        Err(crate::Error::Validation(message)) => Ok(PostFormTemplate {
            client,
            legend: "Update Post".to_owned(),
            action: format!("/post/{}/update", post_id),
            error: message,
            title_value: form.title,
            content_value: form.content,
        }
        .to_response()),
        Err(other) => Err(other),
    }
}

#[post("/post/{id}/delete")]
async fn delete_post(client: ClientCtx, id: web::Path<i32>) -> Result<impl Responder, crate::Error> {
    let db = get_db_pool();
    let user = client.require_user()?;
    let post = crate::posts::find_visible(db, Some(user), *id).await?;
    crate::posts::delete_post(db, user, post).await?;
    Ok(super::redirect("/"))
}

#[post("/post/{id}/toggle_visibility")]
async fn toggle_visibility(
    client: ClientCtx,
    id: web::Path<i32>,
) -> Result<impl Responder, crate::Error> {
    let db = get_db_pool();
    let user = client.require_user()?;
    let post = crate::posts::find_visible(db, Some(user), *id).await?;
    let post = crate::posts::toggle_visibility(db, user, post).await?;

    if post.is_hidden {
        Ok(super::redirect(&format!("/user/{}", user.username)))
    } else {
        Ok(super::redirect(&format!("/post/{}", post.id)))
    }
}

#[post("/comment/{id}/delete")]
async fn delete_comment(
    client: ClientCtx,
    id: web::Path<i32>,
) -> Result<impl Responder, crate::Error> {
    let db = get_db_pool();
    let user = client.require_user()?;
    let comment = comments::find_comment(db, *id).await?;
    let post_id = comment.post_id;
    comments::delete(db, user, comment).await?;
    Ok(super::redirect(&format!("/post/{}", post_id)))
}
