//! Workflow stages
//!
//! A listing session moves through four ordered stages:
//! LINK_ACCOUNT → INTAKE → REVIEW → PUBLISH

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Workflow stage. Ordering follows the workflow, so `Stage::Intake < Stage::Review`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Marketplace account linkage
    LinkAccount,
    /// Photo upload or certification number entry
    Intake,
    /// Listing details awaiting user approval
    Review,
    /// Listing handed to the marketplace
    Publish,
}

/// How a stage relates to the active one, for step indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepProgress {
    Completed,
    Active,
    Upcoming,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::LinkAccount,
        Stage::Intake,
        Stage::Review,
        Stage::Publish,
    ];

    /// 1-based position in the workflow
    pub fn step_number(self) -> u8 {
        match self {
            Stage::LinkAccount => 1,
            Stage::Intake => 2,
            Stage::Review => 3,
            Stage::Publish => 4,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::LinkAccount => "Connect account",
            Stage::Intake => "Upload cards",
            Stage::Review => "Review listing",
            Stage::Publish => "Publish listing",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::LinkAccount => "Authenticate your marketplace seller account",
            Stage::Intake => "Upload photos or enter certification numbers",
            Stage::Review => "Verify and approve your listing details",
            Stage::Publish => "Publish your listing to the marketplace",
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::LinkAccount => Some(Stage::Intake),
            Stage::Intake => Some(Stage::Review),
            Stage::Review => Some(Stage::Publish),
            Stage::Publish => None,
        }
    }

    pub fn previous(self) -> Option<Stage> {
        match self {
            Stage::LinkAccount => None,
            Stage::Intake => Some(Stage::LinkAccount),
            Stage::Review => Some(Stage::Intake),
            Stage::Publish => Some(Stage::Review),
        }
    }

    /// Progress of this stage while `active` is the session's current stage
    pub fn progress(self, active: Stage) -> StepProgress {
        match self.cmp(&active) {
            std::cmp::Ordering::Less => StepProgress::Completed,
            std::cmp::Ordering::Equal => StepProgress::Active,
            std::cmp::Ordering::Greater => StepProgress::Upcoming,
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Stage::LinkAccount => write!(f, "link_account"),
            Stage::Intake => write!(f, "intake"),
            Stage::Review => write!(f, "review"),
            Stage::Publish => write!(f, "publish"),
        }
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "link_account" => Ok(Stage::LinkAccount),
            "intake" => Ok(Stage::Intake),
            "review" => Ok(Stage::Review),
            "publish" => Ok(Stage::Publish),
            _ => Err(anyhow::anyhow!("Invalid stage: {}", s)),
        }
    }
}

/// Stage change emitted to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub session_id: Uuid,
    pub from: Stage,
    pub to: Stage,
    pub transitioned_at: DateTime<Utc>,
}
