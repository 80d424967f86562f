//! Comment tree: arbitrary-depth reply chains anchored to a post.
//!
//! The forest is an arena of rows keyed by id; `parent_id` must reference an
//! already-persisted comment and is never mutated, so cycles cannot form.
//! Depth is never stored and is recomputed by walking parent links.

use crate::content::is_blank;
use crate::error::{Error, Result};
use crate::notifications;
use crate::orm::{comments, posts, users};
use chrono::Utc;
use futures::future::LocalBoxFuture;
use sea_orm::{entity::*, query::*, ConnectionTrait, TransactionTrait};

pub const MAX_COMMENT_LENGTH: usize = 1000;

/// Create a comment, or a reply when `parent_id` is given, and fan out the
/// matching notification in the same transaction.
///
/// A reply adopts its parent's post reference, so a comment's post always
/// equals its parent's post by construction.
pub async fn post_comment<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    author: &users::Model,
    post: &posts::Model,
    content: &str,
    parent_id: Option<i32>,
) -> Result<comments::Model> {
    if is_blank(content) {
        return Err(Error::Validation(
            "Comment content cannot be empty.".to_owned(),
        ));
    }
    let content = content.trim();
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(Error::Validation(format!(
            "Comments cannot be longer than {} characters.",
            MAX_COMMENT_LENGTH
        )));
    }
    if !author.can_author() {
        return Err(Error::Unauthorized(
            "Your account is pending approval. You cannot comment until it is approved.".to_owned(),
        ));
    }

    let parent = match parent_id {
        Some(id) => Some(
            comments::Entity::find_by_id(id)
                .one(db)
                .await?
                .ok_or(Error::NotFound("comment"))?,
        ),
        None => None,
    };

    let txn = db.begin().await?;

    let comment = comments::ActiveModel {
        content: Set(content.to_owned()),
        post_id: Set(parent.as_ref().map(|p| p.post_id).unwrap_or(post.id)),
        user_id: Set(author.id),
        parent_id: Set(parent.as_ref().map(|p| p.id)),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let comment = comment.insert(&txn).await?;

    match &parent {
        Some(parent) => {
            notifications::create_reply_notification(&txn, parent, &comment, author).await?;
        }
        None => {
            notifications::create_comment_notification(&txn, post, &comment, author).await?;
        }
    }

    txn.commit().await?;
    Ok(comment)
}

pub async fn find_comment<C: ConnectionTrait>(db: &C, comment_id: i32) -> Result<comments::Model> {
    comments::Entity::find_by_id(comment_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound("comment"))
}

/// Parentless comments on a post, newest first.
pub async fn list_top_level<C: ConnectionTrait>(
    db: &C,
    post_id: i32,
) -> Result<Vec<comments::Model>> {
    Ok(comments::Entity::find()
        .filter(comments::Column::PostId.eq(post_id))
        .filter(comments::Column::ParentId.is_null())
        .order_by_desc(comments::Column::CreatedAt)
        .order_by_desc(comments::Column::Id)
        .all(db)
        .await?)
}

/// Immediate children of a comment, oldest first.
pub async fn direct_replies<C: ConnectionTrait>(
    db: &C,
    comment_id: i32,
) -> Result<Vec<comments::Model>> {
    Ok(comments::Entity::find()
        .filter(comments::Column::ParentId.eq(comment_id))
        .order_by_asc(comments::Column::CreatedAt)
        .order_by_asc(comments::Column::Id)
        .all(db)
        .await?)
}

fn collect_subtree<'a, C: ConnectionTrait>(
    db: &'a C,
    comment_id: i32,
) -> LocalBoxFuture<'a, Result<Vec<comments::Model>>> {
    Box::pin(async move {
        let mut collected = Vec::new();
        for reply in direct_replies(db, comment_id).await? {
            let reply_id = reply.id;
            collected.push(reply);
            collected.extend(collect_subtree(db, reply_id).await?);
        }
        Ok(collected)
    })
}

/// The entire descendant subtree of a comment in pre-order. A fresh traversal
/// runs on every call; the forest is finite so this always terminates.
pub async fn get_all_replies<C: ConnectionTrait>(
    db: &C,
    comment: &comments::Model,
) -> Result<Vec<comments::Model>> {
    collect_subtree(db, comment.id).await
}

/// Walk parent links to the root. Top-level comments have depth 0.
/// O(depth) queries; nothing is cached.
pub async fn get_depth<C: ConnectionTrait>(db: &C, comment: &comments::Model) -> Result<usize> {
    let mut depth = 0;
    let mut parent_id = comment.parent_id;
    while let Some(id) = parent_id {
        let parent = find_comment(db, id).await?;
        depth += 1;
        parent_id = parent.parent_id;
    }
    Ok(depth)
}

/// Delete a comment together with its whole reply subtree. Author or admin
/// only. Returns the number of comments removed.
pub async fn delete<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    actor: &users::Model,
    comment: comments::Model,
) -> Result<u64> {
    if actor.id != comment.user_id && !actor.is_admin() {
        return Err(Error::Unauthorized(
            "You may not delete someone else's comment.".to_owned(),
        ));
    }

    let txn = db.begin().await?;
    let mut ids: Vec<i32> = collect_subtree(&txn, comment.id)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    ids.push(comment.id);
    let count = ids.len() as u64;

    comments::Entity::delete_many()
        .filter(comments::Column::Id.is_in(ids))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    Ok(count)
}
