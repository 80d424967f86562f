//! SeaORM Entity for notifications table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Recipient.
    pub user_id: i32,
    /// Null for system notifications.
    pub sender_id: Option<i32>,
    /// Category lookup is tolerant: a notification may carry no category.
    pub category_id: Option<i32>,
    /// Originating post, if any. Survives content deletion as null.
    pub post_id: Option<i32>,
    pub comment_id: Option<i32>,
    #[sea_orm(column_name = "type")]
    pub type_: String,
    pub title: String,
    pub message: String,
    /// Relative deep-link, e.g. `/post/{id}#comment-{id}`.
    pub link: Option<String>,
    /// "unread" or "read". Transitions unread -> read exactly once.
    pub status: String,
    pub created_at: DateTime,
    /// Null iff status is "unread".
    pub read_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Recipient,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::SenderId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Sender,
    #[sea_orm(
        belongs_to = "super::notification_categories::Entity",
        from = "Column::CategoryId",
        to = "super::notification_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::posts::Entity",
        from = "Column::PostId",
        to = "super::posts::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Post,
    #[sea_orm(
        belongs_to = "super::comments::Entity",
        from = "Column::CommentId",
        to = "super::comments::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Comment,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipient.def()
    }
}

impl Related<super::notification_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
