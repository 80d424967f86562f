use actix_session::Session;
use actix_web::{get, Responder};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_logout);
}

#[get("/logout")]
async fn view_logout(session: Session) -> impl Responder {
    session.purge();
    super::redirect("/")
}
