//! Post authoring, visibility, and listing.

use crate::content::{validate_body, validate_title};
use crate::error::{Error, Result};
use crate::orm::{comments, posts, users};
use crate::pagination::Page;
use chrono::Utc;
use sea_orm::{entity::*, query::*, ConnectionTrait, PaginatorTrait, TransactionTrait};

/// Author or admin.
fn can_moderate(actor: &users::Model, post: &posts::Model) -> bool {
    actor.id == post.user_id || actor.is_admin()
}

fn require_moderate(actor: &users::Model, post: &posts::Model) -> Result<()> {
    if !can_moderate(actor, post) {
        return Err(Error::Unauthorized(
            "You may not modify someone else's post.".to_owned(),
        ));
    }
    Ok(())
}

pub async fn find_post<C: ConnectionTrait>(db: &C, post_id: i32) -> Result<posts::Model> {
    posts::Entity::find_by_id(post_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound("post"))
}

/// Find a post, treating hidden posts as nonexistent for everyone but their
/// author and admins.
pub async fn find_visible<C: ConnectionTrait>(
    db: &C,
    viewer: Option<&users::Model>,
    post_id: i32,
) -> Result<posts::Model> {
    let post = find_post(db, post_id).await?;
    if post.is_hidden {
        match viewer {
            Some(user) if can_moderate(user, &post) => {}
            _ => return Err(Error::NotFound("post")),
        }
    }
    Ok(post)
}

pub async fn create_post<C: ConnectionTrait>(
    db: &C,
    author: &users::Model,
    title: &str,
    content: &str,
) -> Result<posts::Model> {
    if !author.can_author() {
        return Err(Error::Unauthorized(
            "Your account is pending approval. You cannot create posts yet.".to_owned(),
        ));
    }
    let title = validate_title(title)?;
    let content = validate_body(content, "Post content")?;

    let now = Utc::now().naive_utc();
    let post = posts::ActiveModel {
        title: Set(title),
        content: Set(content),
        user_id: Set(author.id),
        last_modified_by_id: Set(None),
        is_hidden: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(post.insert(db).await?)
}

/// Apply an edit. The editor (author or admin) is always recorded as the last
/// modifier, including on the first edit.
pub async fn update_post<C: ConnectionTrait>(
    db: &C,
    editor: &users::Model,
    post: posts::Model,
    title: &str,
    content: &str,
) -> Result<posts::Model> {
    require_moderate(editor, &post)?;
    let title = validate_title(title)?;
    let content = validate_body(content, "Post content")?;

    let mut active: posts::ActiveModel = post.into();
    active.title = Set(title);
    active.content = Set(content);
    active.last_modified_by_id = Set(Some(editor.id));
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

/// Delete a post and every comment on it.
pub async fn delete_post<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    actor: &users::Model,
    post: posts::Model,
) -> Result<()> {
    require_moderate(actor, &post)?;

    let txn = db.begin().await?;
    comments::Entity::delete_many()
        .filter(comments::Column::PostId.eq(post.id))
        .exec(&txn)
        .await?;
    post.delete(&txn).await?;
    txn.commit().await?;
    Ok(())
}

pub async fn toggle_visibility<C: ConnectionTrait>(
    db: &C,
    actor: &users::Model,
    post: posts::Model,
) -> Result<posts::Model> {
    require_moderate(actor, &post)?;
    let hidden = post.is_hidden;
    let mut active: posts::ActiveModel = post.into();
    active.is_hidden = Set(!hidden);
    Ok(active.update(db).await?)
}

fn visibility_condition(viewer: Option<&users::Model>) -> Option<Condition> {
    match viewer {
        // Admins see everything.
        Some(user) if user.is_admin() => None,
        // Users see public posts plus their own hidden ones.
        Some(user) => Some(
            Condition::any()
                .add(posts::Column::IsHidden.eq(false))
                .add(posts::Column::UserId.eq(user.id)),
        ),
        // Guests see public posts only.
        None => Some(Condition::all().add(posts::Column::IsHidden.eq(false))),
    }
}

/// Home listing, newest first, filtered by the viewer's visibility.
pub async fn visible_posts<C: ConnectionTrait>(
    db: &C,
    viewer: Option<&users::Model>,
) -> Result<Vec<posts::Model>> {
    let mut query = posts::Entity::find();
    if let Some(condition) = visibility_condition(viewer) {
        query = query.filter(condition);
    }
    Ok(query
        .order_by_desc(posts::Column::CreatedAt)
        .order_by_desc(posts::Column::Id)
        .all(db)
        .await?)
}

/// Paginated listing of one author's posts, hidden ones included only for the
/// author themselves and admins.
pub async fn posts_by_author<C: ConnectionTrait>(
    db: &C,
    viewer: Option<&users::Model>,
    author: &users::Model,
    page: u64,
    per_page: u64,
) -> Result<Page<posts::Model>> {
    let mut query = posts::Entity::find().filter(posts::Column::UserId.eq(author.id));

    let viewer_owns = matches!(viewer, Some(u) if u.id == author.id || u.is_admin());
    if !viewer_owns {
        query = query.filter(posts::Column::IsHidden.eq(false));
    }

    let paginator = query
        .order_by_desc(posts::Column::CreatedAt)
        .order_by_desc(posts::Column::Id)
        .paginate(db, per_page.max(1));
    let total_items = paginator.num_items().await?;
    let items = paginator.fetch_page(page.max(1) - 1).await?;
    Ok(Page::new(items, page, per_page, total_items))
}

pub async fn count_posts<C: ConnectionTrait>(db: &C) -> Result<u64> {
    Ok(posts::Entity::find().count(db).await?)
}
