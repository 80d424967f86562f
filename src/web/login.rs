use crate::db::get_db_pool;
use crate::middleware::{self, ClientCtx};
use crate::user;
use actix_session::Session;
use actix_web::{get, post, web, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_login).service(post_login);
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    client: ClientCtx,
    /// Empty when there is nothing to report.
    error: String,
    /// Preserved form input.
    email: String,
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

#[get("/login")]
async fn view_login(client: ClientCtx) -> impl Responder {
    if client.is_user() {
        return super::redirect("/");
    }
    LoginTemplate {
        client,
        error: String::new(),
        email: String::new(),
    }
    .to_response()
}

#[post("/login")]
async fn post_login(
    client: ClientCtx,
    session: Session,
    form: web::Form<LoginForm>,
) -> Result<impl Responder, crate::Error> {
    let db = get_db_pool();
    let form = form.into_inner();

    match user::authenticate(db, &form.email, &form.password).await {
        Ok(user) => {
            session
                .insert(middleware::SESSION_USER_KEY, user.id)
                .map_err(|err| crate::Error::Internal(err.to_string()))?;
            session.renew();
            Ok(super::redirect("/"))
        }
        Err(crate::Error::Unauthorized(message)) => Ok(LoginTemplate {
            client,
            error: message,
            email: form.email,
        }
        .to_response()),
        Err(other) => Err(other),
    }
}
