mod common;

use common::{database, fixtures};
use quillboard::orm::{notifications as notification_rows, posts, users};
use quillboard::{notifications, user, Error};
use sea_orm::{entity::*, query::*, PaginatorTrait};

#[actix_rt::test]
async fn first_registered_user_is_an_approved_admin() {
    let db = database::setup().await;

    let first = user::register(&db, "alice", "alice@example.com", "password123")
        .await
        .expect("register first user");
    assert!(first.is_admin());
    assert!(first.is_approved);

    let second = user::register(&db, "bob", "bob@example.com", "password123")
        .await
        .expect("register second user");
    assert_eq!(second.role, users::ROLE_USER);
    assert!(!second.is_approved);
}

#[actix_rt::test]
async fn duplicate_username_and_email_are_rejected() {
    let db = database::setup().await;
    user::register(&db, "alice", "alice@example.com", "password123")
        .await
        .expect("register");

    let err = user::register(&db, "alice", "other@example.com", "password123")
        .await
        .expect_err("duplicate username");
    assert!(matches!(err, Error::Validation(_)));

    let err = user::register(&db, "other", "alice@example.com", "password123")
        .await
        .expect_err("duplicate email");
    assert!(matches!(err, Error::Validation(_)));

    assert_eq!(user::count_users(&db).await.expect("count"), 1);
}

#[actix_rt::test]
async fn login_requires_correct_password_and_approval() {
    let db = database::setup().await;
    // First user is auto-approved; the second is left pending.
    let admin = user::register(&db, "alice", "alice@example.com", "password123")
        .await
        .expect("register admin");
    let pending = user::register(&db, "bob", "bob@example.com", "hunter2hunter2")
        .await
        .expect("register pending");

    let logged_in = user::authenticate(&db, "alice@example.com", "password123")
        .await
        .expect("admin login");
    assert_eq!(logged_in.id, admin.id);

    let err = user::authenticate(&db, "alice@example.com", "wrong-password")
        .await
        .expect_err("wrong password");
    assert!(matches!(err, Error::Unauthorized(_)));

    // Correct password, but the account has not been approved.
    let err = user::authenticate(&db, "bob@example.com", "hunter2hunter2")
        .await
        .expect_err("pending account");
    assert!(matches!(err, Error::Unauthorized(_)));

    user::approve(&db, &admin, pending.id).await.expect("approve");
    let logged_in = user::authenticate(&db, "bob@example.com", "hunter2hunter2")
        .await
        .expect("approved login");
    assert_eq!(logged_in.id, pending.id);
}

#[actix_rt::test]
async fn approval_sends_a_system_notification() {
    let db = database::setup().await;
    let admin = fixtures::create_user(&db, "admin", true, true).await;
    let pending = fixtures::create_user(&db, "newcomer", false, false).await;

    let approved = user::approve(&db, &admin, pending.id).await.expect("approve");
    assert!(approved.is_approved);

    let rows = notification_rows::Entity::find()
        .filter(notification_rows::Column::UserId.eq(pending.id))
        .all(&db)
        .await
        .expect("fetch notifications");
    assert_eq!(rows.len(), 1);

    let n = &rows[0];
    assert_eq!(n.title, "Account Approved");
    assert_eq!(
        n.message,
        "Your account has been approved! You can now create posts and comments."
    );
    assert_eq!(n.link.as_deref(), Some("/profile"));
    assert_eq!(n.type_, "user_approval");
    assert_eq!(n.status, "unread");
    assert!(n.read_at.is_none());
    assert!(n.sender_id.is_none());

    let system = notifications::find_category_by_name(&db, "System")
        .await
        .expect("lookup")
        .expect("seeded");
    assert_eq!(n.category_id, Some(system.id));
}

#[actix_rt::test]
async fn admins_cannot_change_or_delete_themselves() {
    let db = database::setup().await;
    let admin = fixtures::create_user(&db, "admin", true, true).await;

    let err = user::toggle_role(&db, &admin, admin.id)
        .await
        .expect_err("self role change");
    assert!(matches!(err, Error::Unauthorized(_)));

    let err = user::delete_user(&db, &admin, admin.id)
        .await
        .expect_err("self delete");
    assert!(matches!(err, Error::Unauthorized(_)));
    assert_eq!(user::count_users(&db).await.expect("count"), 1);
}

#[actix_rt::test]
async fn toggle_role_flips_between_user_and_admin() {
    let db = database::setup().await;
    let admin = fixtures::create_user(&db, "admin", true, true).await;
    let member = fixtures::create_user(&db, "member", true, false).await;

    let promoted = user::toggle_role(&db, &admin, member.id).await.expect("promote");
    assert!(promoted.is_admin());
    let demoted = user::toggle_role(&db, &admin, member.id).await.expect("demote");
    assert_eq!(demoted.role, users::ROLE_USER);
}

#[actix_rt::test]
async fn non_admins_cannot_use_admin_operations() {
    let db = database::setup().await;
    let member = fixtures::create_user(&db, "member", true, false).await;
    let other = fixtures::create_user(&db, "other", false, false).await;

    assert!(matches!(
        user::approve(&db, &member, other.id).await,
        Err(Error::Unauthorized(_))
    ));
    assert!(matches!(
        user::toggle_role(&db, &member, other.id).await,
        Err(Error::Unauthorized(_))
    ));
    assert!(matches!(
        user::delete_user(&db, &member, other.id).await,
        Err(Error::Unauthorized(_))
    ));
    assert!(!user::find_user(&db, other.id).await.expect("still there").is_approved);
}

#[actix_rt::test]
async fn deleting_a_user_removes_their_posts() {
    let db = database::setup().await;
    let admin = fixtures::create_user(&db, "admin", true, true).await;
    let author = fixtures::create_user(&db, "author", true, false).await;
    fixtures::create_post(&db, &author, "First").await;
    fixtures::create_post(&db, &author, "Second").await;
    let keeper = fixtures::create_post(&db, &admin, "Mine").await;

    user::delete_user(&db, &admin, author.id).await.expect("delete");

    assert!(matches!(
        user::find_user(&db, author.id).await,
        Err(Error::NotFound(_))
    ));
    let remaining = posts::Entity::find().all(&db).await.expect("posts");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, keeper.id);
}

#[actix_rt::test]
async fn bio_updates_trim_and_clear() {
    let db = database::setup().await;
    let member = fixtures::create_user(&db, "member", true, false).await;

    let member = user::update_bio(&db, member, "  rust and coffee  ")
        .await
        .expect("set bio");
    assert_eq!(member.bio.as_deref(), Some("rust and coffee"));

    let member = user::update_bio(&db, member, "   ").await.expect("clear bio");
    assert!(member.bio.is_none());
}

#[actix_rt::test]
async fn pending_and_approved_listings_partition_users() {
    let db = database::setup().await;
    fixtures::create_user(&db, "admin", true, true).await;
    fixtures::create_user(&db, "approved", true, false).await;
    fixtures::create_user(&db, "waiting_a", false, false).await;
    fixtures::create_user(&db, "waiting_b", false, false).await;

    let pending = user::pending_users(&db).await.expect("pending");
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|u| !u.is_approved));

    let approved = user::approved_users(&db).await.expect("approved");
    assert_eq!(approved.len(), 2);
    assert!(approved.iter().all(|u| u.is_approved));

    assert_eq!(user::count_pending(&db).await.expect("count"), 2);
    assert_eq!(
        users::Entity::find().count(&db).await.expect("count"),
        user::count_users(&db).await.expect("count")
    );
}
