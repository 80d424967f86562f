mod common;

use common::{database, fixtures};
use quillboard::orm::comments as comment_rows;
use quillboard::{comments, posts, Error};
use sea_orm::{EntityTrait, PaginatorTrait};

#[actix_rt::test]
async fn unapproved_authors_cannot_create_posts() {
    let db = database::setup().await;
    let pending = fixtures::create_user(&db, "pending", false, false).await;

    let err = posts::create_post(&db, &pending, "Hello", "<p>body</p>")
        .await
        .expect_err("pending author");
    assert!(matches!(err, Error::Unauthorized(_)));
    assert_eq!(posts::count_posts(&db).await.expect("count"), 0);
}

#[actix_rt::test]
async fn empty_editor_markup_is_rejected_as_blank() {
    let db = database::setup().await;
    let author = fixtures::create_user(&db, "author", true, false).await;

    // The rich-text editor submits this placeholder when nothing was typed.
    let err = posts::create_post(&db, &author, "Hello", "<p><br></p>")
        .await
        .expect_err("placeholder body");
    assert!(matches!(err, Error::Validation(_)));

    let post = posts::create_post(&db, &author, "Hello", "<p>real content</p>")
        .await
        .expect("create");
    let err = posts::update_post(&db, &author, post, "Hello", "<p><br></p>")
        .await
        .expect_err("placeholder body on update");
    assert!(matches!(err, Error::Validation(_)));
}

#[actix_rt::test]
async fn titles_are_trimmed_and_length_checked() {
    let db = database::setup().await;
    let author = fixtures::create_user(&db, "author", true, false).await;

    let err = posts::create_post(&db, &author, "   ", "<p>body</p>")
        .await
        .expect_err("blank title");
    assert!(matches!(err, Error::Validation(_)));

    let long = "x".repeat(101);
    let err = posts::create_post(&db, &author, &long, "<p>body</p>")
        .await
        .expect_err("title too long");
    assert!(matches!(err, Error::Validation(_)));

    let post = posts::create_post(&db, &author, "  Spaced Out  ", "<p>body</p>")
        .await
        .expect("create");
    assert_eq!(post.title, "Spaced Out");
}

#[actix_rt::test]
async fn edits_record_the_last_modifier() {
    let db = database::setup().await;
    let author = fixtures::create_user(&db, "author", true, false).await;
    let admin = fixtures::create_user(&db, "admin", true, true).await;
    let stranger = fixtures::create_user(&db, "stranger", true, false).await;

    let post = posts::create_post(&db, &author, "Original", "<p>v1</p>")
        .await
        .expect("create");
    assert!(post.last_modified_by_id.is_none());

    let post = posts::update_post(&db, &author, post, "Original", "<p>v2</p>")
        .await
        .expect("author edit");
    assert_eq!(post.last_modified_by_id, Some(author.id));

    let post = posts::update_post(&db, &admin, post, "Moderated", "<p>v3</p>")
        .await
        .expect("admin edit");
    assert_eq!(post.last_modified_by_id, Some(admin.id));

    let err = posts::update_post(&db, &stranger, post, "Nope", "<p>v4</p>")
        .await
        .expect_err("stranger edit");
    assert!(matches!(err, Error::Unauthorized(_)));
}

#[actix_rt::test]
async fn hidden_posts_are_invisible_except_to_author_and_admins() {
    let db = database::setup().await;
    let author = fixtures::create_user(&db, "author", true, false).await;
    let admin = fixtures::create_user(&db, "admin", true, true).await;
    let stranger = fixtures::create_user(&db, "stranger", true, false).await;

    let post = posts::create_post(&db, &author, "Secret", "<p>body</p>")
        .await
        .expect("create");
    let post = posts::toggle_visibility(&db, &author, post)
        .await
        .expect("hide");
    assert!(post.is_hidden);

    // Guests and unrelated users see nothing.
    assert!(matches!(
        posts::find_visible(&db, None, post.id).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        posts::find_visible(&db, Some(&stranger), post.id).await,
        Err(Error::NotFound(_))
    ));

    assert!(posts::find_visible(&db, Some(&author), post.id).await.is_ok());
    assert!(posts::find_visible(&db, Some(&admin), post.id).await.is_ok());

    assert!(posts::visible_posts(&db, None).await.expect("guest feed").is_empty());
    assert!(posts::visible_posts(&db, Some(&stranger))
        .await
        .expect("stranger feed")
        .is_empty());
    assert_eq!(
        posts::visible_posts(&db, Some(&author)).await.expect("author feed").len(),
        1
    );
    assert_eq!(
        posts::visible_posts(&db, Some(&admin)).await.expect("admin feed").len(),
        1
    );

    let post = posts::toggle_visibility(&db, &author, post)
        .await
        .expect("unhide");
    assert!(!post.is_hidden);
    assert!(posts::find_visible(&db, None, post.id).await.is_ok());
}

#[actix_rt::test]
async fn author_pages_paginate_and_respect_visibility() {
    let db = database::setup().await;
    let author = fixtures::create_user(&db, "author", true, false).await;
    for i in 0..7 {
        fixtures::create_post(&db, &author, &format!("Post {}", i)).await;
    }
    let hidden = fixtures::create_post(&db, &author, "Hidden one").await;
    posts::toggle_visibility(&db, &author, hidden).await.expect("hide");

    // A guest sees 7 public posts across two pages of 5.
    let page1 = posts::posts_by_author(&db, None, &author, 1, 5)
        .await
        .expect("page 1");
    assert_eq!(page1.items.len(), 5);
    assert_eq!(page1.total_items, 7);
    assert_eq!(page1.total_pages, 2);
    assert!(!page1.has_prev());
    assert!(page1.has_next());

    let page2 = posts::posts_by_author(&db, None, &author, 2, 5)
        .await
        .expect("page 2");
    assert_eq!(page2.items.len(), 2);
    assert!(page2.has_prev());
    assert!(!page2.has_next());

    // The author sees the hidden post too.
    let own = posts::posts_by_author(&db, Some(&author), &author, 1, 5)
        .await
        .expect("own page");
    assert_eq!(own.total_items, 8);
}

#[actix_rt::test]
async fn deleting_a_post_removes_its_comments() {
    let db = database::setup().await;
    let author = fixtures::create_user(&db, "author", true, false).await;
    let commenter = fixtures::create_user(&db, "commenter", true, false).await;

    let post = posts::create_post(&db, &author, "Discussed", "<p>body</p>")
        .await
        .expect("create");
    let top = comments::post_comment(&db, &commenter, &post, "first", None)
        .await
        .expect("comment");
    comments::post_comment(&db, &author, &post, "reply", Some(top.id))
        .await
        .expect("reply");

    let other = fixtures::create_post(&db, &author, "Untouched").await;
    fixtures::create_comment(&db, &other, &commenter, None, "elsewhere").await;

    posts::delete_post(&db, &author, post.clone()).await.expect("delete");

    assert!(matches!(
        posts::find_post(&db, post.id).await,
        Err(Error::NotFound(_))
    ));
    assert_eq!(
        comment_rows::Entity::find().count(&db).await.expect("count"),
        1
    );
}

#[actix_rt::test]
async fn only_author_or_admin_can_delete_a_post() {
    let db = database::setup().await;
    let author = fixtures::create_user(&db, "author", true, false).await;
    let stranger = fixtures::create_user(&db, "stranger", true, false).await;
    let admin = fixtures::create_user(&db, "admin", true, true).await;

    let post = fixtures::create_post(&db, &author, "Contested").await;
    let err = posts::delete_post(&db, &stranger, post.clone())
        .await
        .expect_err("stranger delete");
    assert!(matches!(err, Error::Unauthorized(_)));

    posts::delete_post(&db, &admin, post).await.expect("admin delete");
    assert_eq!(posts::count_posts(&db).await.expect("count"), 0);
}
