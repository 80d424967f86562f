#![allow(dead_code)]

use chrono::Utc;
use quillboard::orm::{comments, posts, users};
use sea_orm::{entity::*, DatabaseConnection};

/// Not a verifiable hash. Tests that exercise login go through
/// `user::register`, which hashes for real; everything else skips the cost.
const PLACEHOLDER_HASH: &str =
    "$argon2id$v=19$m=4096,t=3,p=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    approved: bool,
    admin: bool,
) -> users::Model {
    users::ActiveModel {
        username: Set(username.to_owned()),
        email: Set(format!("{}@example.com", username)),
        password: Set(PLACEHOLDER_HASH.to_owned()),
        role: Set(if admin {
            users::ROLE_ADMIN.to_owned()
        } else {
            users::ROLE_USER.to_owned()
        }),
        is_approved: Set(approved),
        bio: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user")
}

pub async fn create_post(
    db: &DatabaseConnection,
    author: &users::Model,
    title: &str,
) -> posts::Model {
    let now = Utc::now().naive_utc();
    posts::ActiveModel {
        title: Set(title.to_owned()),
        content: Set(format!("<p>{}</p>", title)),
        user_id: Set(author.id),
        last_modified_by_id: Set(None),
        is_hidden: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert post")
}

pub async fn create_comment(
    db: &DatabaseConnection,
    post: &posts::Model,
    author: &users::Model,
    parent_id: Option<i32>,
    content: &str,
) -> comments::Model {
    comments::ActiveModel {
        content: Set(content.to_owned()),
        post_id: Set(post.id),
        user_id: Set(author.id),
        parent_id: Set(parent_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert comment")
}
