use crate::db::get_db_pool;
use crate::orm::users;
use actix_session::Session;
use actix_web::dev::{
    self, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform,
};
use actix_web::{web::Data, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use sea_orm::EntityTrait;
use std::rc::Rc;
use std::time::Instant;

pub const SESSION_USER_KEY: &str = "uid";

/// Client data resolved once per request cycle from the session cookie.
#[derive(Clone, Debug)]
pub struct ClientCtxInner {
    /// Authenticated user. None is a guest.
    pub client: Option<users::Model>,
    /// Unread notification badge count for the navbar.
    pub unread_notifications: u64,
    /// Time the request started, for page statistics.
    pub request_start: Instant,
}

impl Default for ClientCtxInner {
    fn default() -> Self {
        Self {
            client: None,
            unread_notifications: 0,
            request_start: Instant::now(),
        }
    }
}

impl ClientCtxInner {
    pub async fn from_session(session: &Session) -> Self {
        let db = get_db_pool();

        let client = match session.get::<i32>(SESSION_USER_KEY) {
            Ok(Some(user_id)) => match users::Entity::find_by_id(user_id).one(db).await {
                Ok(user) => user,
                Err(err) => {
                    log::error!("failed to load session user {}: {}", user_id, err);
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                log::error!("unreadable session cookie: {}", err);
                None
            }
        };

        let unread_notifications = match &client {
            Some(user) => crate::notifications::unread_count(db, user.id)
                .await
                .unwrap_or(0),
            None => 0,
        };

        ClientCtxInner {
            client,
            unread_notifications,
            ..Default::default()
        }
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug)]
pub struct ClientCtx(Data<ClientCtxInner>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Data::new(ClientCtxInner::default()))
    }
}

impl ClientCtx {
    fn get_or_default_from_extensions(extensions: &mut Extensions) -> Self {
        match extensions.get::<Data<ClientCtxInner>>() {
            Some(cbox) => Self(cbox.clone()),
            None => {
                let cbox = Data::new(ClientCtxInner::default());
                extensions.insert(cbox.clone());
                Self(cbox)
            }
        }
    }

    pub fn get_id(&self) -> Option<i32> {
        self.0.client.as_ref().map(|u| u.id)
    }

    pub fn get_user(&self) -> Option<&users::Model> {
        self.0.client.as_ref()
    }

    /// Returns either the user's name or the word for guest.
    pub fn get_name(&self) -> String {
        match &self.0.client {
            Some(user) => user.username.to_owned(),
            None => "Guest".to_owned(),
        }
    }

    pub fn get_unread_notifications(&self) -> u64 {
        self.0.unread_notifications
    }

    pub fn is_user(&self) -> bool {
        self.0.client.is_some()
    }

    pub fn is_admin(&self) -> bool {
        matches!(&self.0.client, Some(user) if user.is_admin())
    }

    /// True if the client owns the resource or is an admin.
    pub fn can_moderate(&self, owner_id: i32) -> bool {
        match &self.0.client {
            Some(user) => user.id == owner_id || user.is_admin(),
            None => false,
        }
    }

    /// Require a logged-in user. Returns the user or a 403.
    pub fn require_user(&self) -> Result<&users::Model, crate::Error> {
        self.0
            .client
            .as_ref()
            .ok_or_else(|| crate::Error::Unauthorized("You must be logged in.".to_owned()))
    }

    /// Require a logged-in admin.
    pub fn require_admin(&self) -> Result<&users::Model, crate::Error> {
        let user = self.require_user()?;
        if !user.is_admin() {
            return Err(crate::Error::Unauthorized(
                "You do not have permission to perform this action.".to_owned(),
            ));
        }
        Ok(user)
    }
}

/// This implementation is what actually provides the `client: ClientCtx` in
/// the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(ClientCtx::get_or_default_from_extensions(
            &mut req.extensions_mut(),
        )))
    }
}

impl<S: 'static, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ClientCtxMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ClientCtxMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();

        // Borrows of `req` must be done in a precise way to avoid conflicts.
        // This order is important.
        let (httpreq, payload) = req.into_parts();
        let session = Session::extract(&httpreq).into_inner();
        let req = ServiceRequest::from_parts(httpreq, payload);

        Box::pin(async move {
            match session {
                Ok(session) => {
                    let inner = ClientCtxInner::from_session(&session).await;
                    req.extensions_mut().insert(Data::new(inner));
                }
                Err(err) => {
                    log::error!("Unable to extract Session data in middleware: {}", err);
                }
            };

            svc.call(req).await
        })
    }
}
