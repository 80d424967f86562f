//! Identity operations: registration, credential checks, admin actions.
//!
//! Every authorization-sensitive operation takes the acting user explicitly;
//! there is no ambient current-user state below the web layer.

use crate::error::{Error, Result};
use crate::notifications;
use crate::orm::users;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use sea_orm::{entity::*, query::*, ConnectionTrait, PaginatorTrait, TransactionTrait};

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| Error::Internal(format!("password hashing failed: {}", err)))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            log::error!("stored password hash is unparseable: {}", err);
            false
        }
    }
}

pub async fn find_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<users::Model> {
    users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound("user"))
}

/// Create an account. The first account ever registered becomes an
/// auto-approved admin; everyone else waits for approval.
pub async fn register<C: ConnectionTrait>(
    db: &C,
    username: &str,
    email: &str,
    password: &str,
) -> Result<users::Model> {
    let username = username.trim();
    let email = email.trim();

    let taken = users::Entity::find()
        .filter(
            Condition::any()
                .add(users::Column::Username.eq(username))
                .add(users::Column::Email.eq(email)),
        )
        .one(db)
        .await?;
    if let Some(existing) = taken {
        let field = if existing.username == username {
            "username"
        } else {
            "email"
        };
        return Err(Error::Validation(format!(
            "That {} is already registered.",
            field
        )));
    }

    let first_user = users::Entity::find().count(db).await? == 0;

    let user = users::ActiveModel {
        username: Set(username.to_owned()),
        email: Set(email.to_owned()),
        password: Set(hash_password(password)?),
        role: Set(if first_user {
            users::ROLE_ADMIN.to_owned()
        } else {
            users::ROLE_USER.to_owned()
        }),
        is_approved: Set(first_user),
        bio: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    Ok(user.insert(db).await?)
}

/// Check credentials for login. Unapproved non-admin accounts are rejected
/// with a pending-approval message even when the password is correct.
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: &str,
) -> Result<users::Model> {
    let user = users::Entity::find()
        .filter(users::Column::Email.eq(email.trim()))
        .one(db)
        .await?;

    let user = match user {
        Some(user) if verify_password(password, &user.password) => user,
        _ => {
            return Err(Error::Unauthorized(
                "Login unsuccessful. Please check email and password.".to_owned(),
            ))
        }
    };

    if !user.is_approved && !user.is_admin() {
        return Err(Error::Unauthorized(
            "Your account is pending approval. Please wait for an administrator to approve it."
                .to_owned(),
        ));
    }

    Ok(user)
}

pub async fn update_bio<C: ConnectionTrait>(
    db: &C,
    user: users::Model,
    bio: &str,
) -> Result<users::Model> {
    let mut active: users::ActiveModel = user.into();
    let bio = bio.trim();
    active.bio = Set(if bio.is_empty() {
        None
    } else {
        Some(bio.to_owned())
    });
    Ok(active.update(db).await?)
}

fn require_admin(actor: &users::Model) -> Result<()> {
    if !actor.is_admin() {
        return Err(Error::Unauthorized(
            "You do not have permission to perform this action.".to_owned(),
        ));
    }
    Ok(())
}

/// Approve a pending account and notify the user, atomically.
pub async fn approve<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    actor: &users::Model,
    user_id: i32,
) -> Result<users::Model> {
    require_admin(actor)?;
    let user = find_user(db, user_id).await?;

    let txn = db.begin().await?;
    let mut active: users::ActiveModel = user.into();
    active.is_approved = Set(true);
    let user = active.update(&txn).await?;
    notifications::create_approval_notification(&txn, &user).await?;
    txn.commit().await?;

    Ok(user)
}

/// Flip a user between the user and admin roles. Admins cannot change their
/// own role.
pub async fn toggle_role<C: ConnectionTrait>(
    db: &C,
    actor: &users::Model,
    user_id: i32,
) -> Result<users::Model> {
    require_admin(actor)?;
    if actor.id == user_id {
        return Err(Error::Unauthorized(
            "You cannot change your own role.".to_owned(),
        ));
    }
    let user = find_user(db, user_id).await?;

    let new_role = if user.is_admin() {
        users::ROLE_USER
    } else {
        users::ROLE_ADMIN
    };
    let mut active: users::ActiveModel = user.into();
    active.role = Set(new_role.to_owned());
    Ok(active.update(db).await?)
}

/// Delete an account and the posts it owns. Admins cannot delete themselves.
/// Comments and notification settings follow through declared cascades.
pub async fn delete_user<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    actor: &users::Model,
    user_id: i32,
) -> Result<()> {
    require_admin(actor)?;
    if actor.id == user_id {
        return Err(Error::Unauthorized(
            "You cannot delete your own admin account.".to_owned(),
        ));
    }
    let user = find_user(db, user_id).await?;

    let txn = db.begin().await?;
    crate::orm::posts::Entity::delete_many()
        .filter(crate::orm::posts::Column::UserId.eq(user.id))
        .exec(&txn)
        .await?;
    user.delete(&txn).await?;
    txn.commit().await?;

    Ok(())
}

pub async fn all_users<C: ConnectionTrait>(db: &C) -> Result<Vec<users::Model>> {
    Ok(users::Entity::find()
        .order_by_asc(users::Column::Id)
        .all(db)
        .await?)
}

pub async fn pending_users<C: ConnectionTrait>(db: &C) -> Result<Vec<users::Model>> {
    Ok(users::Entity::find()
        .filter(users::Column::IsApproved.eq(false))
        .order_by_asc(users::Column::Id)
        .all(db)
        .await?)
}

/// Everyone an admin broadcast fans out to.
pub async fn approved_users<C: ConnectionTrait>(db: &C) -> Result<Vec<users::Model>> {
    Ok(users::Entity::find()
        .filter(users::Column::IsApproved.eq(true))
        .order_by_asc(users::Column::Id)
        .all(db)
        .await?)
}

pub async fn find_by_username<C: ConnectionTrait>(db: &C, username: &str) -> Result<users::Model> {
    users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(db)
        .await?
        .ok_or(Error::NotFound("user"))
}

pub async fn count_users<C: ConnectionTrait>(db: &C) -> Result<u64> {
    Ok(users::Entity::find().count(db).await?)
}

pub async fn count_pending<C: ConnectionTrait>(db: &C) -> Result<u64> {
    Ok(users::Entity::find()
        .filter(users::Column::IsApproved.eq(false))
        .count(db)
        .await?)
}
