//! # Doctor Repository
//!
//! Read access to the doctor directory. A bill may reference a doctor; the
//! display name is copied onto the bill at sale time.

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use pharmos_core::Doctor;

#[derive(Debug, Clone)]
pub struct DoctorRepository {
    pool: SqlitePool,
}

impl DoctorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DoctorRepository { pool }
    }

    /// Gets a doctor by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Doctor>> {
        let doctor = sqlx::query_as::<_, Doctor>(
            "SELECT id, name, specialization, phone FROM doctors WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(doctor)
    }

    /// Inserts a doctor with a generated ID (seed data and tests).
    pub async fn insert(
        &self,
        name: &str,
        specialization: Option<&str>,
        phone: Option<&str>,
    ) -> DbResult<Doctor> {
        let doctor = Doctor {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            specialization: specialization.map(str::to_string),
            phone: phone.map(str::to_string),
        };

        debug!(id = %doctor.id, name = %doctor.name, "Inserting doctor");

        sqlx::query(
            "INSERT INTO doctors (id, name, specialization, phone) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&doctor.id)
        .bind(&doctor.name)
        .bind(&doctor.specialization)
        .bind(&doctor.phone)
        .execute(&self.pool)
        .await?;

        Ok(doctor)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let doctor = db
            .doctors()
            .insert("Dr. Meera Iyer", Some("Pediatrics"), None)
            .await
            .unwrap();

        let found = db.doctors().get_by_id(&doctor.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Dr. Meera Iyer");
        assert_eq!(found.specialization.as_deref(), Some("Pediatrics"));
        assert!(db.doctors().get_by_id("nope").await.unwrap().is_none());
    }
}
