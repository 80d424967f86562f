pub mod comments;
pub mod notification_categories;
pub mod notification_setting_categories;
pub mod notification_settings;
pub mod notifications;
pub mod posts;
pub mod users;
