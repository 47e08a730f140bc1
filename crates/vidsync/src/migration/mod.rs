//! Schema migrations. Only compiled with the `migrate` feature.

pub use sea_orm_migration::prelude::*;
use sea_orm_migration::MigrationStatus;

mod m20240601_000001_create_schema;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240601_000001_create_schema::Migration)]
    }

    fn migration_table_name() -> SeaRc<dyn Iden> {
        SeaRc::new(Alias::new("vidsync_migrations"))
    }
}

/// One known migration and whether the database has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationState {
    pub name: String,
    pub applied: bool,
}

/// Every migration this build knows about, oldest first.
pub async fn schema_status(
    db: &::sea_orm::DatabaseConnection,
) -> Result<Vec<MigrationState>, DbErr> {
    Ok(Migrator::get_migration_with_status(db)
        .await?
        .iter()
        .map(|m| MigrationState {
            name: m.name().to_string(),
            applied: matches!(m.status(), MigrationStatus::Applied),
        })
        .collect())
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn status_tracks_up_and_down() {
        let db = crate::db::connect("sqlite::memory:").await.unwrap();

        let before = schema_status(&db).await.unwrap();
        assert_eq!(before.len(), 1);
        assert!(!before[0].applied);

        Migrator::up(&db, None).await.unwrap();
        assert!(schema_status(&db).await.unwrap().iter().all(|m| m.applied));

        Migrator::down(&db, Some(1)).await.unwrap();
        assert!(schema_status(&db).await.unwrap().iter().all(|m| !m.applied));
    }
}
