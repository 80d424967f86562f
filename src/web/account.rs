use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::posts;
use crate::pagination::Page;
use crate::user;
use actix_web::{get, post, web, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_register)
        .service(post_register)
        .service(view_profile)
        .service(update_profile)
        .service(view_user_posts);
}

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    client: ClientCtx,
    error: String,
    /// Preserved form input.
    username: String,
    email: String,
}

#[derive(Deserialize, Validate)]
struct RegisterForm {
    #[validate(length(min = 3, max = 32, message = "Username must be 3-32 characters."))]
    username: String,
    #[validate(email(message = "Please enter a valid email address."))]
    email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    password: String,
}

#[get("/register")]
async fn view_register(client: ClientCtx) -> impl Responder {
    if client.is_user() {
        return super::redirect("/");
    }
    RegisterTemplate {
        client,
        error: String::new(),
        username: String::new(),
        email: String::new(),
    }
    .to_response()
}

#[post("/register")]
async fn post_register(
    client: ClientCtx,
    form: web::Form<RegisterForm>,
) -> Result<impl Responder, crate::Error> {
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
        return Ok(RegisterTemplate {
            client,
            error: message,
            username: form.username,
            email: form.email,
        }
        .to_response());
    }

    match user::register(get_db_pool(), &form.username, &form.email, &form.password).await {
        Ok(_) => Ok(super::redirect("/login")),
        Err(crate::Error::Validation(message)) => Ok(RegisterTemplate {
            client,
            error: message,
            username: form.username,
            email: form.email,
        }
        .to_response()),
        Err(other) => Err(other),
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfileTemplate {
    client: ClientCtx,
    username: String,
    email: String,
    role: String,
    bio: String,
}

#[get("/profile")]
async fn view_profile(client: ClientCtx) -> Result<impl Responder, crate::Error> {
    let user = client.require_user()?.clone();
    Ok(ProfileTemplate {
        username: user.username,
        email: user.email,
        role: user.role,
        bio: user.bio.unwrap_or_default(),
        client,
    }
    .to_response())
}

#[derive(Deserialize)]
struct ProfileForm {
    bio: String,
}

#[post("/profile")]
async fn update_profile(
    client: ClientCtx,
    form: web::Form<ProfileForm>,
) -> Result<impl Responder, crate::Error> {
    let user = client.require_user()?.clone();
    user::update_bio(get_db_pool(), user, &form.bio).await?;
    Ok(super::redirect("/profile"))
}

#[derive(Template)]
#[template(path = "user_posts.html")]
struct UserPostsTemplate {
    client: ClientCtx,
    username: String,
    posts: Page<posts::Model>,
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<u64>,
}

pub const POSTS_PER_PAGE: u64 = 5;

#[get("/user/{username}")]
async fn view_user_posts(
    client: ClientCtx,
    username: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, crate::Error> {
    let db = get_db_pool();
    let author = user::find_by_username(db, &username).await?;
    let posts = crate::posts::posts_by_author(
        db,
        client.get_user(),
        &author,
        query.page.unwrap_or(1),
        POSTS_PER_PAGE,
    )
    .await?;

    Ok(UserPostsTemplate {
        client,
        username: author.username,
        posts,
    }
    .to_response())
}
