use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calc;
use crate::error::GradebookError;
use crate::gradebook::GradebookId;

/// Date attached to an assignment, as entered.
///
/// Only the field ranges are checked (day 31 is accepted for every month);
/// `to_naive_date` tells whether it is also a real calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentDate {
    pub month: u32,
    pub day: u32,
    pub year: i32,
}

impl AssignmentDate {
    pub fn new(month: u32, day: u32, year: i32) -> Result<Self, GradebookError> {
        let d = Self { month, day, year };
        d.validate()?;
        Ok(d)
    }

    pub fn validate(&self) -> Result<(), GradebookError> {
        if !(1..=12).contains(&self.month) {
            return Err(GradebookError::validation(
                "date",
                format!("month {} outside 1-12", self.month),
            ));
        }
        if !(1..=31).contains(&self.day) {
            return Err(GradebookError::validation(
                "date",
                format!("day {} outside 1-31", self.day),
            ));
        }
        if self.year <= 0 {
            return Err(GradebookError::validation(
                "date",
                format!("year {} must be positive", self.year),
            ));
        }
        Ok(())
    }

    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl fmt::Display for AssignmentDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.month, self.day, self.year)
    }
}

/// Parses `month/day/year`.
impl FromStr for AssignmentDate {
    type Err = GradebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').map(|p| p.trim()).collect();
        if parts.len() != 3 {
            return Err(GradebookError::validation(
                "date",
                format!("expected month/day/year, got {:?}", s),
            ));
        }
        let bad = |_| GradebookError::validation("date", format!("non-numeric date {:?}", s));
        let month = parts[0].parse::<u32>().map_err(bad)?;
        let day = parts[1].parse::<u32>().map_err(bad)?;
        let year = parts[2].parse::<i32>().map_err(bad)?;
        Self::new(month, day, year)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub score: f64,
    pub date: Option<AssignmentDate>,
}

/// Returned by `Category::force_average`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForcedAverage {
    pub average: f64,
    /// The value is above 100; accepted, but worth telling the user.
    pub above_scale: bool,
}

/// A named group of assignments with an average that is either computed
/// from the scores or pinned by hand.
///
/// Invariant: `average` is `None` iff there are no assignments and the
/// average is not manual.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    name: String,
    average: Option<f64>,
    is_manual: bool,
    assignments: BTreeMap<String, Assignment>,
    #[serde(skip)]
    owner: Option<GradebookId>,
}

/// Names end up one per line in `.gb` files, between `****` delimiters.
pub(crate) fn validate_name(field: &'static str, name: &str) -> Result<String, GradebookError> {
    let t = name.trim();
    if t.is_empty() {
        return Err(GradebookError::validation(field, "must not be empty"));
    }
    if t.contains(['\n', '\r']) {
        return Err(GradebookError::validation(field, "must be a single line"));
    }
    if t.contains(crate::loader::SECTION_DELIMITER) {
        return Err(GradebookError::validation(
            field,
            format!("must not contain {:?}", crate::loader::SECTION_DELIMITER),
        ));
    }
    Ok(t.to_string())
}

fn validate_average(value: f64) -> Result<(), GradebookError> {
    if !value.is_finite() {
        return Err(GradebookError::validation("average", "must be a finite number"));
    }
    if value < 0.0 {
        return Err(GradebookError::validation(
            "average",
            format!("{} is negative", value),
        ));
    }
    Ok(())
}

impl Category {
    /// A supplied `average` pins the category to manual mode.
    pub fn new(name: impl AsRef<str>, average: Option<f64>) -> Result<Self, GradebookError> {
        let name = validate_name("name", name.as_ref())?;
        if let Some(v) = average {
            validate_average(v)?;
        }
        Ok(Self {
            name,
            average,
            is_manual: average.is_some(),
            assignments: BTreeMap::new(),
            owner: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn average(&self) -> Option<f64> {
        self.average
    }

    pub fn is_manual(&self) -> bool {
        self.is_manual
    }

    pub fn owner(&self) -> Option<GradebookId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<GradebookId>) {
        self.owner = owner;
    }

    /// Copy of the assignment map; changing it does not touch the category.
    pub fn assignments(&self) -> BTreeMap<String, Assignment> {
        self.assignments.clone()
    }

    pub fn assignment(&self, name: &str) -> Option<&Assignment> {
        self.assignments.get(name)
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    /// Renames the category itself. A registered category must be renamed
    /// through `Gradebook::rename_category` so the gradebook key follows.
    pub fn rename(&mut self, new_name: &str) -> Result<(), GradebookError> {
        self.name = validate_name("name", new_name)?;
        Ok(())
    }

    /// Inserts or overwrites an assignment.
    pub fn add_grade(
        &mut self,
        name: &str,
        score: f64,
        date: Option<AssignmentDate>,
    ) -> Result<(), GradebookError> {
        let name = validate_name("assignment", name)?;
        if !score.is_finite() {
            return Err(GradebookError::validation("score", "must be a finite number"));
        }
        if score < 0.0 {
            return Err(GradebookError::validation(
                "score",
                format!("{} is negative", score),
            ));
        }
        if let Some(d) = &date {
            d.validate()?;
        }

        self.assignments.insert(name, Assignment { score, date });
        self.recompute();
        Ok(())
    }

    pub fn remove_grade(&mut self, name: &str) -> Result<Assignment, GradebookError> {
        let Some(removed) = self.assignments.remove(name.trim()) else {
            return Err(GradebookError::not_found("assignment", name));
        };
        self.recompute();
        Ok(removed)
    }

    pub fn force_average(&mut self, value: f64) -> Result<ForcedAverage, GradebookError> {
        validate_average(value)?;
        self.average = Some(value);
        self.is_manual = true;
        let above_scale = value > 100.0;
        if above_scale {
            tracing::warn!(
                category = %self.name,
                average = value,
                "average has been set to a number greater than 100"
            );
        }
        Ok(ForcedAverage {
            average: value,
            above_scale,
        })
    }

    pub fn resume_auto_average(&mut self) {
        self.is_manual = false;
        self.recompute();
    }

    fn recompute(&mut self) {
        if self.is_manual {
            return;
        }
        self.average = calc::mean_2_decimals(self.assignments.values().map(|a| a.score));
        tracing::debug!(
            category = %self.name,
            average = ?self.average,
            assignments = self.assignments.len(),
            "category average recomputed"
        );
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.average {
            Some(avg) => write!(f, "{} ({:.2})", self.name, avg),
            None => write!(f, "{} (no average)", self.name),
        }
    }
}
