pub mod account;
pub mod admin;
pub mod index;
pub mod login;
pub mod logout;
pub mod notifications;
pub mod post;

use crate::orm::users;
use actix_web::http::header;
use actix_web::HttpResponse;
use sea_orm::{entity::*, query::*, ConnectionTrait};
use std::collections::HashMap;

/// Configures the web app by adding services from each web file.
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Route resolution stops at the first match, so modules with literal
    // paths that shadow parameterized ones must come first.
    index::configure(conf);
    account::configure(conf);
    admin::configure(conf);
    login::configure(conf);
    logout::configure(conf);
    notifications::configure(conf);
    post::configure(conf);
}

/// 303 redirect, the right response to a successful form POST.
pub(crate) fn redirect(to: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, to.to_owned()))
        .finish()
}

/// Resolve a batch of user ids to usernames for display.
pub(crate) async fn username_map<C: ConnectionTrait>(
    db: &C,
    mut user_ids: Vec<i32>,
) -> Result<HashMap<i32, String>, crate::Error> {
    user_ids.sort_unstable();
    user_ids.dedup();
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(users::Entity::find()
        .filter(users::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect())
}
