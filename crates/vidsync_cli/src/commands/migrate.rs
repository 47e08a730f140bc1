use console::style;
use tabled::{Table, Tabled, settings::Style};
use vidsync::db;
use vidsync::migration::{MigrationState, Migrator, MigratorTrait, schema_status};

use crate::MigrateAction;

#[derive(Tabled)]
struct MigrationRow {
    #[tabled(rename = "Migration")]
    name: String,
    #[tabled(rename = "State")]
    state: &'static str,
}

impl From<&MigrationState> for MigrationRow {
    fn from(m: &MigrationState) -> Self {
        Self {
            name: m.name.clone(),
            state: if m.applied { "applied" } else { "pending" },
        }
    }
}

fn pending_count(states: &[MigrationState]) -> usize {
    states.iter().filter(|m| !m.applied).count()
}

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = pending_count(&schema_status(&db).await?);
            if pending == 0 {
                println!("Schema is up to date.");
                return Ok(());
            }
            Migrator::up(&db, None).await?;
            println!(
                "{} Applied {} migration(s)",
                style("✓").green().bold(),
                pending
            );
        }
        MigrateAction::Down => {
            Migrator::down(&db, Some(1)).await?;
            println!("{} Rolled back the latest migration", style("✓").green().bold());
        }
        MigrateAction::Status => {
            let states = schema_status(&db).await?;
            let rows: Vec<MigrationRow> = states.iter().map(MigrationRow::from).collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
            println!("{} pending", pending_count(&states));
        }
        MigrateAction::Fresh { yes } => {
            if !yes {
                eprintln!(
                    "{} This drops every vidsync table. Re-run with --yes to continue.",
                    style("⚠").yellow().bold()
                );
                return Ok(());
            }
            tracing::warn!(database_url, "dropping schema and re-applying migrations");
            Migrator::fresh(&db).await?;
            println!("{} Schema rebuilt", style("✓").green().bold());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_count_ignores_applied() {
        let states = vec![
            MigrationState {
                name: "m1".to_string(),
                applied: true,
            },
            MigrationState {
                name: "m2".to_string(),
                applied: false,
            },
        ];
        assert_eq!(pending_count(&states), 1);
        assert_eq!(MigrationRow::from(&states[1]).state, "pending");
    }
}
