use quillboard::notifications;
use quillboard::orm::{
    comments, notification_categories, notification_setting_categories, notification_settings,
    notifications as notification_rows, posts, users,
};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Schema};

/// Fresh in-memory SQLite database with the full schema and the default
/// notification categories seeded.
pub async fn setup() -> DatabaseConnection {
    let db = connect().await;
    notifications::seed_default_categories(&db)
        .await
        .expect("seed categories");
    db
}

/// Schema only. Used by tests that exercise behavior when no categories
/// exist yet.
#[allow(dead_code)]
pub async fn setup_without_categories() -> DatabaseConnection {
    connect().await
}

async fn connect() -> DatabaseConnection {
    // A single connection keeps every query on the same :memory: database.
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options.max_connections(1);
    let db = Database::connect(options).await.expect("connect to sqlite");

    let schema = Schema::new(DbBackend::Sqlite);
    let backend = db.get_database_backend();
    let statements = [
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(posts::Entity),
        schema.create_table_from_entity(comments::Entity),
        schema.create_table_from_entity(notification_categories::Entity),
        schema.create_table_from_entity(notification_rows::Entity),
        schema.create_table_from_entity(notification_settings::Entity),
        schema.create_table_from_entity(notification_setting_categories::Entity),
    ];
    for statement in statements {
        db.execute(backend.build(&statement))
            .await
            .expect("create table");
    }
    db
}
