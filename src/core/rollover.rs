//! Academic year rollover business logic
//!
//! Changing the current academic year is two independently retryable steps:
//!
//! 1. commit the new year to the settings row (together with a fresh cascade
//!    checkpoint for the year being left behind), then
//! 2. sweep the previous year's active passes to `expired`, one page per store
//!    transaction, advancing the checkpoint with every page.
//!
//! A crash between or during the two steps leaves the new year in force and the
//! checkpoint incomplete. Calling [`set_academic_year`] again with the same year does
//! not rewrite settings but picks the sweep up from the checkpoint; [`resume_cascade`]
//! does the same for an explicitly named year.

use crate::{
    core::{
        academic_year::AcademicYear,
        settings,
        types::{Caller, EXPIRED_REASON_YEAR_CHANGE, PassState},
    },
    entities::{Pass, RolloverCheckpoint, pass, rollover_checkpoint},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use std::fmt::Write;
use tracing::{debug, info, instrument, warn};

/// Passes fetched and updated per cascade batch
pub const DEFAULT_PAGE_SIZE: u64 = 400;

/// Tuning for a cascade run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeOptions {
    /// Records per page; each page is one atomic batch
    pub page_size: u64,
    /// Stop after this many pages; the checkpoint lets a later call continue
    pub max_pages: Option<usize>,
}

impl Default for CascadeOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: None,
        }
    }
}

/// What one cascade run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    /// Year whose passes were expired
    pub from_year: String,
    /// Passes expired by this run
    pub expired_count: u64,
    /// Passes expired across all runs for this year
    pub total_expired: i64,
    /// Student ids left untouched because their pass status was not recognised
    pub flagged: Vec<String>,
    /// Batches committed by this run
    pub batches: usize,
    /// Whether the sweep reached the end
    pub completed: bool,
}

/// Result of [`set_academic_year`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloverOutcome {
    /// Whether the settings row was written
    pub changed: bool,
    /// The (normalised) year now in force
    pub academic_year: String,
    /// The year in force before, if any
    pub previous_year: Option<String>,
    /// Passes expired by this call
    pub expired_count: u64,
    /// Passes flagged for manual review by this call
    pub flagged: Vec<String>,
    /// Batches committed by this call
    pub batches: usize,
    /// False while a cascade still has pages left
    pub completed: bool,
    /// Human-readable result
    pub message: String,
}

/// Changes the current academic year and expires the previous year's passes.
///
/// Repeating the call with the same year is a no-op unless the earlier cascade into
/// that year did not finish, in which case it is resumed.
#[instrument(skip(db, options), fields(actor = %caller.id))]
pub async fn set_academic_year(
    db: &DatabaseConnection,
    new_year: &str,
    caller: &Caller,
    options: &CascadeOptions,
) -> Result<RolloverOutcome> {
    caller.require_admin("set academic year")?;
    let new_year = AcademicYear::parse(new_year)?;

    let previous_year = settings::get_current_academic_year(db).await?;

    if previous_year.as_deref() == Some(new_year.as_str()) {
        return resume_unfinished_rollover(db, &new_year, options).await;
    }

    let txn = db.begin().await?;
    settings::write_academic_year(&txn, &new_year, previous_year.clone(), &caller.id).await?;
    if let Some(prev) = &previous_year {
        start_checkpoint(&txn, prev, Some(new_year.to_string())).await?;
    }
    txn.commit().await?;

    info!(
        from = previous_year.as_deref().unwrap_or("<none>"),
        to = %new_year,
        "Academic year updated"
    );

    let Some(prev) = previous_year else {
        return Ok(RolloverOutcome {
            changed: true,
            academic_year: new_year.to_string(),
            previous_year: None,
            expired_count: 0,
            flagged: Vec::new(),
            batches: 0,
            completed: true,
            message: format!("Academic year set to {new_year}"),
        });
    };

    let report = run_cascade(db, &prev, options).await?;
    let message = if report.completed {
        format!(
            "Academic year updated to {new_year}; expired {} passes from {prev}",
            report.expired_count
        )
    } else {
        format!(
            "Academic year updated to {new_year}; expired {} passes from {prev} so far, cascade incomplete",
            report.expired_count
        )
    };

    Ok(RolloverOutcome {
        changed: true,
        academic_year: new_year.to_string(),
        previous_year: Some(prev),
        expired_count: report.expired_count,
        flagged: report.flagged,
        batches: report.batches,
        completed: report.completed,
        message,
    })
}

async fn resume_unfinished_rollover(
    db: &DatabaseConnection,
    year: &AcademicYear,
    options: &CascadeOptions,
) -> Result<RolloverOutcome> {
    let unfinished = RolloverCheckpoint::find()
        .filter(rollover_checkpoint::Column::ToYear.eq(year.as_str()))
        .filter(rollover_checkpoint::Column::Completed.eq(false))
        .one(db)
        .await?;

    let Some(checkpoint) = unfinished else {
        debug!(year = %year, "Academic year unchanged, nothing to resume");
        return Ok(RolloverOutcome {
            changed: false,
            academic_year: year.to_string(),
            previous_year: None,
            expired_count: 0,
            flagged: Vec::new(),
            batches: 0,
            completed: true,
            message: format!("Academic year is already {year}"),
        });
    };

    info!(
        from_year = %checkpoint.from_year,
        to_year = %year,
        "Resuming unfinished rollover cascade"
    );
    let report = run_cascade(db, &checkpoint.from_year, options).await?;

    Ok(RolloverOutcome {
        changed: false,
        academic_year: year.to_string(),
        previous_year: Some(checkpoint.from_year.clone()),
        expired_count: report.expired_count,
        flagged: report.flagged,
        batches: report.batches,
        completed: report.completed,
        message: format!(
            "Academic year is already {year}; resumed cascade and expired {} passes from {}",
            report.expired_count, checkpoint.from_year
        ),
    })
}

/// Expires the active passes of `from_year` without touching settings.
///
/// Continues from an unfinished checkpoint, or sweeps from the start if the year was
/// never swept or its last sweep completed. Refuses the current academic year.
#[instrument(skip(db, options), fields(actor = %caller.id))]
pub async fn resume_cascade(
    db: &DatabaseConnection,
    from_year: &str,
    caller: &Caller,
    options: &CascadeOptions,
) -> Result<CascadeReport> {
    caller.require_admin("resume rollover cascade")?;
    let from_year = AcademicYear::parse(from_year)?;

    if settings::get_current_academic_year(db).await?.as_deref() == Some(from_year.as_str()) {
        return Err(Error::InvalidAcademicYear {
            input: from_year.to_string(),
            message: "passes of the current academic year cannot be expired".to_string(),
        });
    }

    match get_checkpoint(db, from_year.as_str()).await? {
        Some(checkpoint) if !checkpoint.completed => {}
        Some(checkpoint) => {
            start_checkpoint(db, from_year.as_str(), checkpoint.to_year).await?;
        }
        None => {
            start_checkpoint(db, from_year.as_str(), None).await?;
        }
    }

    run_cascade(db, from_year.as_str(), options).await
}

/// Loads the cascade checkpoint for a year.
pub async fn get_checkpoint<C>(
    db: &C,
    from_year: &str,
) -> Result<Option<rollover_checkpoint::Model>>
where
    C: ConnectionTrait,
{
    RolloverCheckpoint::find_by_id(from_year.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates the checkpoint for `from_year`, or resets an existing one to the start.
async fn start_checkpoint<C>(
    db: &C,
    from_year: &str,
    to_year: Option<String>,
) -> Result<rollover_checkpoint::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();

    if let Some(existing) = get_checkpoint(db, from_year).await? {
        let mut active_model: rollover_checkpoint::ActiveModel = existing.into();
        active_model.to_year = Set(to_year);
        active_model.last_student_id = Set(None);
        active_model.expired_count = Set(0);
        active_model.flagged_count = Set(0);
        active_model.completed = Set(false);
        active_model.updated_at = Set(now);
        active_model.update(db).await.map_err(Into::into)
    } else {
        let checkpoint = rollover_checkpoint::ActiveModel {
            from_year: Set(from_year.to_string()),
            to_year: Set(to_year),
            last_student_id: Set(None),
            expired_count: Set(0),
            flagged_count: Set(0),
            completed: Set(false),
            updated_at: Set(now),
        };
        checkpoint.insert(db).await.map_err(Into::into)
    }
}

/// Sweeps pages until the end of the matching passes or `max_pages`.
///
/// Each page is read, expired and checkpointed inside one transaction, and the cursor
/// is re-read from the checkpoint at the start of every page, so concurrent runners
/// and crashed runs never skip or repeat a page.
async fn run_cascade(
    db: &DatabaseConnection,
    from_year: &str,
    options: &CascadeOptions,
) -> Result<CascadeReport> {
    let page_size = options.page_size.max(1);
    let mut report = CascadeReport {
        from_year: from_year.to_string(),
        expired_count: 0,
        total_expired: 0,
        flagged: Vec::new(),
        batches: 0,
        completed: false,
    };

    loop {
        if options.max_pages.is_some_and(|max| report.batches >= max) {
            info!(
                from_year,
                batches = report.batches,
                "Cascade paused at page limit"
            );
            break;
        }

        let txn = db.begin().await?;

        let checkpoint = match get_checkpoint(&txn, from_year).await? {
            Some(checkpoint) => checkpoint,
            None => start_checkpoint(&txn, from_year, None).await?,
        };
        if checkpoint.completed {
            txn.commit().await?;
            report.total_expired = checkpoint.expired_count;
            report.completed = true;
            break;
        }

        let mut query = Pass::find()
            .filter(pass::Column::AcademicYear.eq(from_year))
            .filter(pass::Column::Status.ne(PassState::Expired.as_str()));
        if let Some(cursor) = &checkpoint.last_student_id {
            query = query.filter(pass::Column::StudentId.gt(cursor.as_str()));
        }
        let page = query
            .order_by_asc(pass::Column::StudentId)
            .limit(page_size)
            .all(&txn)
            .await?;

        let (active, unrecognised): (Vec<_>, Vec<_>) = page
            .iter()
            .partition(|p| PassState::from_stored(&p.status) == Some(PassState::Active));

        for flagged in &unrecognised {
            warn!(
                student_id = %flagged.student_id,
                status = %flagged.status,
                academic_year = from_year,
                "Pass has an unrecognised status; left for manual review"
            );
        }

        let expired = if active.is_empty() {
            0
        } else {
            let now = Utc::now();
            Pass::update_many()
                .set(pass::ActiveModel {
                    status: Set(PassState::Expired.as_str().to_string()),
                    expired_at: Set(Some(now)),
                    expired_reason: Set(Some(EXPIRED_REASON_YEAR_CHANGE.to_string())),
                    expired_from_academic_year: Set(Some(from_year.to_string())),
                    ..Default::default()
                })
                .filter(pass::Column::StudentId.is_in(active.iter().map(|p| p.student_id.clone())))
                .filter(pass::Column::Status.eq(PassState::Active.as_str()))
                .exec(&txn)
                .await?
                .rows_affected
        };

        let page_len = page.len();
        let completed = u64::try_from(page_len).unwrap_or(u64::MAX) < page_size;
        let total_expired = checkpoint.expired_count + i64::try_from(expired).unwrap_or(i64::MAX);
        let flagged_total =
            checkpoint.flagged_count + i64::try_from(unrecognised.len()).unwrap_or(i64::MAX);
        let cursor = page
            .last()
            .map(|p| p.student_id.clone())
            .or_else(|| checkpoint.last_student_id.clone());

        let mut active_checkpoint: rollover_checkpoint::ActiveModel = checkpoint.into();
        active_checkpoint.last_student_id = Set(cursor);
        active_checkpoint.expired_count = Set(total_expired);
        active_checkpoint.flagged_count = Set(flagged_total);
        active_checkpoint.completed = Set(completed);
        active_checkpoint.updated_at = Set(Utc::now());
        active_checkpoint.update(&txn).await?;

        txn.commit().await?;

        report.batches += 1;
        report.expired_count += expired;
        report.total_expired = total_expired;
        report
            .flagged
            .extend(unrecognised.iter().map(|p| p.student_id.clone()));

        debug!(
            from_year,
            batch = report.batches,
            fetched = page_len,
            expired,
            "Cascade batch committed"
        );

        if completed {
            report.completed = true;
            break;
        }
    }

    info!(
        from_year,
        expired = report.expired_count,
        flagged = report.flagged.len(),
        batches = report.batches,
        completed = report.completed,
        "Cascade run finished"
    );
    Ok(report)
}

/// Formats a rollover outcome into a human-readable summary string.
#[must_use]
pub fn format_rollover_summary(outcome: &RolloverOutcome) -> String {
    let mut summary = format!(
        "Rollover - {} - {}\n",
        outcome.academic_year,
        if outcome.changed { "changed" } else { "unchanged" }
    );

    if let Some(prev) = &outcome.previous_year {
        // write! is infallible when writing to String
        let _ = writeln!(
            summary,
            "  Expired from {prev}: {} passes in {} batches{}",
            outcome.expired_count,
            outcome.batches,
            if outcome.completed { "" } else { " (incomplete)" }
        );
    }

    if !outcome.flagged.is_empty() {
        let _ = writeln!(
            summary,
            "  Flagged for review: {}",
            outcome.flagged.join(", ")
        );
    }

    summary
}
