//! SeaORM Entity for the settings <-> categories join table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notification_setting_categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub settings_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub category_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::notification_settings::Entity",
        from = "Column::SettingsId",
        to = "super::notification_settings::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Settings,
    #[sea_orm(
        belongs_to = "super::notification_categories::Entity",
        from = "Column::CategoryId",
        to = "super::notification_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Category,
}

impl Related<super::notification_settings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Settings.def()
    }
}

impl Related<super::notification_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
