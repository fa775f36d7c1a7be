//! Settings singleton access.
//!
//! Readers always go to the store; nothing here caches the current year, since
//! verification must see a rollover the moment it commits.

use crate::{
    core::academic_year::AcademicYear,
    entities::{Settings, settings},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};

/// Loads the settings row, if a rollover has ever happened.
pub async fn get_settings<C>(db: &C) -> Result<Option<settings::Model>>
where
    C: ConnectionTrait,
{
    Settings::find_by_id(settings::SETTINGS_ID)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Current academic year, or `None` before the first rollover.
pub async fn get_current_academic_year<C>(db: &C) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    Ok(get_settings(db)
        .await?
        .and_then(|settings| settings.current_academic_year))
}

/// Current academic year, failing with [`Error::AcademicYearNotSet`] when absent.
pub async fn require_current_academic_year<C>(db: &C) -> Result<String>
where
    C: ConnectionTrait,
{
    get_current_academic_year(db)
        .await?
        .ok_or(Error::AcademicYearNotSet)
}

/// Writes a new current year with merge semantics.
///
/// Only the year, previous year, audit fields and version change; any other column
/// on an existing row is preserved. The version is bumped on every write.
pub(crate) async fn write_academic_year<C>(
    db: &C,
    new_year: &AcademicYear,
    previous_year: Option<String>,
    updated_by: &str,
) -> Result<settings::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();

    if let Some(existing) = get_settings(db).await? {
        let next_version = existing.version + 1;
        let mut active_model: settings::ActiveModel = existing.into();
        active_model.current_academic_year = Set(Some(new_year.to_string()));
        active_model.previous_academic_year = Set(previous_year);
        active_model.version = Set(next_version);
        active_model.updated_at = Set(now);
        active_model.updated_by = Set(updated_by.to_string());
        active_model.update(db).await.map_err(Into::into)
    } else {
        let new_settings = settings::ActiveModel {
            id: Set(settings::SETTINGS_ID),
            current_academic_year: Set(Some(new_year.to_string())),
            previous_academic_year: Set(previous_year),
            version: Set(1),
            updated_at: Set(now),
            updated_by: Set(updated_by.to_string()),
        };
        new_settings.insert(db).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_no_settings_before_first_write() -> Result<()> {
        let db = setup_test_db().await?;

        assert!(get_settings(&db).await?.is_none());
        assert!(get_current_academic_year(&db).await?.is_none());
        assert!(matches!(
            require_current_academic_year(&db).await,
            Err(Error::AcademicYearNotSet)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_write_creates_then_updates_single_row() -> Result<()> {
        let db = setup_test_db().await?;

        let first = AcademicYear::parse("2024-2025")?;
        let created = write_academic_year(&db, &first, None, "admin1").await?;
        assert_eq!(created.version, 1);
        assert_eq!(created.current_academic_year.as_deref(), Some("2024-2025"));
        assert!(created.previous_academic_year.is_none());

        let second = AcademicYear::parse("2025-2026")?;
        let updated =
            write_academic_year(&db, &second, Some("2024-2025".to_string()), "admin2").await?;
        assert_eq!(updated.version, 2);
        assert_eq!(updated.current_academic_year.as_deref(), Some("2025-2026"));
        assert_eq!(updated.previous_academic_year.as_deref(), Some("2024-2025"));
        assert_eq!(updated.updated_by, "admin2");

        assert_eq!(Settings::find().count(&db).await?, 1);
        assert_eq!(
            require_current_academic_year(&db).await?,
            "2025-2026".to_string()
        );

        Ok(())
    }
}
