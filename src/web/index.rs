use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::posts;
use actix_web::{get, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use std::collections::HashMap;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_home);
}

pub struct PostSummary {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub is_hidden: bool,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    client: ClientCtx,
    posts: Vec<PostSummary>,
}

#[get("/")]
async fn view_home(client: ClientCtx) -> Result<impl Responder, crate::Error> {
    let db = get_db_pool();
    let posts = crate::posts::visible_posts(db, client.get_user()).await?;

    let authors: HashMap<i32, String> =
        super::username_map(db, posts.iter().map(|p| p.user_id).collect()).await?;

    let posts = posts
        .into_iter()
        .map(|p: posts::Model| PostSummary {
            id: p.id,
            title: p.title,
            author: authors
                .get(&p.user_id)
                .cloned()
                .unwrap_or_else(|| "unknown".to_owned()),
            is_hidden: p.is_hidden,
            created_at: p.created_at,
        })
        .collect();

    Ok(HomeTemplate { client, posts }.to_response())
}
