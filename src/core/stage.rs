//! Stage (fare zone) business logic.
//!
//! Stages are seeded from `config.toml`; this module validates their fees and
//! hands the payment guard a [`StageFees`] view.

use crate::{
    config::app::StageConfig,
    entities::{Stage, stage},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// The three amounts a student can be charged for a stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageFees {
    /// Fee when paid in one go
    pub full_fee: f64,
    /// First semester installment
    pub installment1: f64,
    /// Second semester installment
    pub installment2: f64,
}

impl StageFees {
    /// Checks that every amount is finite and non-negative and that the two
    /// installments add up to the full fee.
    pub fn validate(&self) -> Result<()> {
        for amount in [self.full_fee, self.installment1, self.installment2] {
            if !amount.is_finite() || amount < 0.0 {
                return Err(Error::InvalidAmount { amount });
            }
        }

        if (self.installment1 + self.installment2 - self.full_fee).abs() > 0.005 {
            return Err(Error::Config {
                message: format!(
                    "installments {:.2} + {:.2} do not add up to full fee {:.2}",
                    self.installment1, self.installment2, self.full_fee
                ),
            });
        }

        Ok(())
    }
}

impl From<&stage::Model> for StageFees {
    fn from(model: &stage::Model) -> Self {
        Self {
            full_fee: model.full_fee,
            installment1: model.installment1,
            installment2: model.installment2,
        }
    }
}

/// Lists all stages alphabetically.
pub async fn get_all_stages(db: &DatabaseConnection) -> Result<Vec<stage::Model>> {
    Stage::find()
        .order_by_asc(stage::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a stage by its exact name.
pub async fn get_stage_by_name<C>(db: &C, name: &str) -> Result<Option<stage::Model>>
where
    C: ConnectionTrait,
{
    Stage::find()
        .filter(stage::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Fees for a stage, failing with [`Error::StageNotFound`] if it does not exist.
pub async fn get_stage_fees<C>(db: &C, name: &str) -> Result<StageFees>
where
    C: ConnectionTrait,
{
    get_stage_by_name(db, name)
        .await?
        .map(|stage| StageFees::from(&stage))
        .ok_or_else(|| Error::StageNotFound {
            name: name.to_string(),
        })
}

/// Creates a stage after validating its name and fees.
pub async fn create_stage(
    db: &DatabaseConnection,
    name: String,
    fees: StageFees,
) -> Result<stage::Model> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput {
            message: "Stage name cannot be empty".to_string(),
        });
    }
    fees.validate()?;

    let stage = stage::ActiveModel {
        name: Set(name.trim().to_string()),
        full_fee: Set(fees.full_fee),
        installment1: Set(fees.installment1),
        installment2: Set(fees.installment2),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    stage.insert(db).await.map_err(Into::into)
}

/// Inserts every configured stage that is not in the store yet.
///
/// Existing stages are left alone so fees edited in the database survive a restart.
/// Returns the number of stages created.
pub async fn seed_stages(db: &DatabaseConnection, stages: &[StageConfig]) -> Result<usize> {
    let mut created = 0;

    for config in stages {
        if get_stage_by_name(db, config.name.trim()).await?.is_some() {
            debug!(stage = %config.name, "Stage already present, skipping seed");
            continue;
        }

        create_stage(
            db,
            config.name.clone(),
            StageFees {
                full_fee: config.full_fee,
                installment1: config.installment1,
                installment2: config.installment2,
            },
        )
        .await?;
        created += 1;
    }

    info!(created, configured = stages.len(), "Stages seeded");
    Ok(created)
}
