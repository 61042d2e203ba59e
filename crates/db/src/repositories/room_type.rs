use chrono::Utc;

use roomquote_core::domain::room_type::{RoomType, RoomTypeId};

use super::{column, decimal_column, RepositoryError, RoomTypeRepository};
use crate::DbPool;

pub struct SqlRoomTypeRepository {
    pool: DbPool,
}

impl SqlRoomTypeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_room_type(row: &sqlx::sqlite::SqliteRow) -> Result<RoomType, RepositoryError> {
    Ok(RoomType {
        id: RoomTypeId(column(row, "id")?),
        name: column(row, "name")?,
        price_per_area: decimal_column(row, "price_per_area")?,
        active: column(row, "active")?,
        display_order: column(row, "display_order")?,
    })
}

#[async_trait::async_trait]
impl RoomTypeRepository for SqlRoomTypeRepository {
    async fn load_room_types(&self) -> Result<Vec<RoomType>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, price_per_area, active, display_order
             FROM room_type
             ORDER BY display_order ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_room_type).collect()
    }

    async fn save(&self, room_type: RoomType) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO room_type (id, name, price_per_area, active, display_order,
                                    created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 price_per_area = excluded.price_per_area,
                 active = excluded.active,
                 display_order = excluded.display_order,
                 updated_at = excluded.updated_at",
        )
        .bind(&room_type.id.0)
        .bind(&room_type.name)
        .bind(room_type.price_per_area.to_string())
        .bind(room_type.active)
        .bind(room_type.display_order)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use roomquote_core::domain::room_type::{RoomType, RoomTypeId};

    use super::SqlRoomTypeRepository;
    use crate::repositories::RoomTypeRepository;
    use crate::{connect_with_settings, migrations};

    fn room_type(id: &str, rate: Decimal, active: bool, order: i32) -> RoomType {
        RoomType {
            id: RoomTypeId(id.to_string()),
            name: format!("Room {id}"),
            price_per_area: rate,
            active,
            display_order: order,
        }
    }

    #[tokio::test]
    async fn sql_room_type_repo_round_trip_and_upsert() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repo = SqlRoomTypeRepository::new(pool.clone());

        let standard = room_type("standard", Decimal::new(250, 2), true, 2);
        let storage = room_type("storage", Decimal::new(1125, 3), false, 1);
        repo.save(standard.clone()).await.expect("save standard");
        repo.save(storage.clone()).await.expect("save storage");

        let loaded = repo.load_room_types().await.expect("load");
        assert_eq!(loaded, vec![storage, standard.clone()]);

        let repriced = RoomType { price_per_area: Decimal::new(275, 2), ..standard };
        repo.save(repriced.clone()).await.expect("upsert");
        let loaded = repo.load_room_types().await.expect("reload");
        assert_eq!(loaded.len(), 2);
        assert!(loaded.contains(&repriced));

        pool.close().await;
    }
}
