use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};

/// Free-text note owned by one attendance record.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_notes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub attendance_id: i64,
    pub description: String,
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_record::Entity",
        from = "Column::AttendanceId",
        to = "super::attendance_record::Column::Id"
    )]
    Attendance,
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Note content as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteContent {
    pub description: String,
    pub attachment_url: Option<String>,
}

impl Model {
    /// Notes of a record in insertion order.
    pub async fn list_for_record<C: ConnectionTrait>(
        db: &C,
        attendance_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::AttendanceId.eq(attendance_id))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Appends notes in submission order.
    pub async fn append<C: ConnectionTrait>(
        db: &C,
        attendance_id: i64,
        notes: &[NoteContent],
    ) -> Result<Vec<Model>, DbErr> {
        let mut created = Vec::with_capacity(notes.len());
        for note in notes {
            created.push(Self::insert_one(db, attendance_id, note).await?);
        }
        Ok(created)
    }

    /// Synchronizes a record's notes with `incoming` by list position.
    ///
    /// Index `i` overwrites the `i`-th existing note (keeping its id) or creates a new
    /// one; existing notes past the end of `incoming` are deleted. An empty `incoming`
    /// leaves the notes untouched. Returns the resulting notes in order.
    pub async fn sync_positional<C: ConnectionTrait>(
        db: &C,
        attendance_id: i64,
        incoming: &[NoteContent],
    ) -> Result<Vec<Model>, DbErr> {
        let existing = Self::list_for_record(db, attendance_id).await?;
        if incoming.is_empty() {
            return Ok(existing);
        }

        let now = Utc::now();
        let mut result = Vec::with_capacity(incoming.len());
        for (i, note) in incoming.iter().enumerate() {
            match existing.get(i) {
                Some(current) => {
                    let mut active: ActiveModel = current.clone().into();
                    active.description = Set(note.description.clone());
                    active.attachment_url = Set(note.attachment_url.clone());
                    active.updated_at = Set(now);
                    result.push(active.update(db).await?);
                }
                None => result.push(Self::insert_one(db, attendance_id, note).await?),
            }
        }

        let stale: Vec<i64> = existing.iter().skip(incoming.len()).map(|n| n.id).collect();
        if !stale.is_empty() {
            Entity::delete_many()
                .filter(Column::Id.is_in(stale))
                .exec(db)
                .await?;
        }

        Ok(result)
    }

    async fn insert_one<C: ConnectionTrait>(
        db: &C,
        attendance_id: i64,
        note: &NoteContent,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        ActiveModel {
            attendance_id: Set(attendance_id),
            description: Set(note.description.clone()),
            attachment_url: Set(note.attachment_url.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        attendance_record::{self, Punctuality, Stamp},
        user,
    };
    use crate::test_utils::setup_test_db;
    use chrono::NaiveDate;
    use sea_orm::DatabaseConnection;

    fn note(text: &str) -> NoteContent {
        NoteContent {
            description: text.into(),
            attachment_url: None,
        }
    }

    async fn record(db: &DatabaseConnection) -> attendance_record::Model {
        let u = user::Model::create(db, "Ayu", "ayu@example.com", user::Role::Karyawan, None)
            .await
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let stamp = Stamp {
            at: date.and_hms_opt(8, 0, 0).unwrap(),
            location_id: None,
            lat: 0.0,
            lng: 0.0,
            distance_m: None,
            face_verified: true,
        };
        attendance_record::Model::create_check_in(db, "t-1", u.id, date, &stamp, Punctuality::Tepat)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn empty_sync_keeps_existing_notes() {
        let db = setup_test_db().await;
        let rec = record(&db).await;
        let before = Model::append(&db, rec.id, &[note("a"), note("b")]).await.unwrap();

        let after = Model::sync_positional(&db, rec.id, &[]).await.unwrap();
        let ids = |v: &[Model]| v.iter().map(|n| (n.id, n.description.clone())).collect::<Vec<_>>();
        assert_eq!(ids(&after), ids(&before));
    }

    #[tokio::test]
    async fn shorter_sync_reuses_rows_and_deletes_extras() {
        let db = setup_test_db().await;
        let rec = record(&db).await;
        let before = Model::append(&db, rec.id, &[note("a"), note("b"), note("c")])
            .await
            .unwrap();

        let after = Model::sync_positional(&db, rec.id, &[note("x")]).await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, before[0].id);
        assert_eq!(after[0].description, "x");

        let stored = Model::list_for_record(&db, rec.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, before[0].id);
    }

    #[tokio::test]
    async fn longer_sync_overwrites_then_creates() {
        let db = setup_test_db().await;
        let rec = record(&db).await;
        let before = Model::append(&db, rec.id, &[note("a")]).await.unwrap();

        let incoming = [
            NoteContent {
                description: "a2".into(),
                attachment_url: Some("https://files.example.com/a2.png".into()),
            },
            note("b"),
            note("c"),
        ];
        let after = Model::sync_positional(&db, rec.id, &incoming).await.unwrap();

        assert_eq!(after.len(), 3);
        assert_eq!(after[0].id, before[0].id);
        assert_eq!(after[0].attachment_url.as_deref(), Some("https://files.example.com/a2.png"));
        assert!(after[1].id > before[0].id);
        let texts: Vec<_> = Model::list_for_record(&db, rec.id)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.description)
            .collect();
        assert_eq!(texts, vec!["a2", "b", "c"]);
    }
}
