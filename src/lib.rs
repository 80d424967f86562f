pub mod comments;
pub mod content;
pub mod db;
pub mod error;
pub mod middleware;
pub mod notifications;
pub mod orm;
pub mod pagination;
pub mod posts;
pub mod user;
pub mod web;

pub use error::{Error, Result};
