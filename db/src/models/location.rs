use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, PaginatorTrait, QueryOrder, Set};
use serde::Serialize;
use util::geo::GeoPoint;

/// A registered office or site that check-ins are geofenced against.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Geofence radius in meters. `None` or non-positive means "use the default".
    pub radius: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker. Deleted locations never resolve.
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        name: &str,
        latitude: f64,
        longitude: f64,
        radius: Option<i32>,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        ActiveModel {
            name: Set(name.to_owned()),
            latitude: Set(latitude),
            longitude: Set(longitude),
            radius: Set(radius),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Looks up a location that has not been soft-deleted.
    pub async fn find_active<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id)
            .filter(Column::DeletedAt.is_null())
            .one(db)
            .await
    }

    pub async fn all_active<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::DeletedAt.is_null())
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Paged, case-insensitive name search. Returns the page and the total match count.
    pub async fn search<C: ConnectionTrait>(
        db: &C,
        query: Option<&str>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<Model>, u64), DbErr> {
        let mut select = Entity::find().filter(Column::DeletedAt.is_null());
        if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
            select = select.filter(Column::Name.contains(q));
        }
        let paginator = select.order_by_asc(Column::Name).paginate(db, page_size);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}
