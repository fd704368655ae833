use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calc;
use crate::category::{validate_name, Assignment, AssignmentDate, Category, ForcedAverage};
use crate::error::GradebookError;

/// Handle a category keeps to the gradebook it is registered in.
///
/// It is an identifier, not a pointer: the gradebook owns its categories and
/// nothing points back into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradebookId(Uuid);

impl GradebookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for GradebookId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GradebookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for GradebookId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A registered category with the gradebook's view of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryEntry {
    pub category: Category,
    /// Snapshot of `category.average()` taken at the last registration/refresh.
    pub cached_average: Option<f64>,
    pub weight: f64,
}

/// Inclusive `[min, max]` range mapped to a letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub letter: String,
    pub min: f64,
    pub max: f64,
}

impl GradeBand {
    pub fn new(letter: &str, min: f64, max: f64) -> Result<Self, GradebookError> {
        let letter = letter.trim();
        if letter.is_empty() {
            return Err(GradebookError::validation("letter", "must not be empty"));
        }
        if letter.contains([',', '\n', '\r'])
            || letter.contains(crate::loader::SECTION_DELIMITER)
        {
            return Err(GradebookError::validation(
                "letter",
                "must not contain commas, line breaks or \"****\"",
            ));
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(GradebookError::validation(
                "gradeBand",
                "bounds must be finite numbers",
            ));
        }
        if min > max {
            return Err(GradebookError::validation(
                "gradeBand",
                format!("min {} is above max {}", min, max),
            ));
        }
        Ok(Self {
            letter: letter.to_string(),
            min,
            max,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        calc::in_range(value, self.min, self.max)
    }
}

/// Standard A-F scale.
pub fn default_grade_bands() -> Vec<GradeBand> {
    [
        ("A", 90.0, 100.0),
        ("B", 80.0, 89.99),
        ("C", 75.0, 79.99),
        ("D", 70.0, 74.99),
        ("F", 0.0, 69.99),
    ]
    .into_iter()
    .map(|(letter, min, max)| GradeBand {
        letter: letter.to_string(),
        min,
        max,
    })
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HypotheticalProjection {
    pub score: f64,
    pub class_average: Option<f64>,
}

/// Class averages after one more assignment in a category.
///
/// Each value is `None` when the weights do not allow a class average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    /// The new assignment scores 0.
    pub minimum: Option<f64>,
    /// The new assignment scores 100.
    pub maximum: Option<f64>,
    pub hypothetical: Option<HypotheticalProjection>,
}

const PROJECTION_SENTINEL: &str = "__projected__";

#[derive(Debug, Clone)]
pub struct Gradebook {
    id: GradebookId,
    categories: BTreeMap<String, CategoryEntry>,
    class_average: Option<f64>,
    weights_valid: bool,
    grade_bands: Vec<GradeBand>,
}

impl Default for Gradebook {
    fn default() -> Self {
        Self::new(false)
    }
}

fn validate_weight(weight: f64) -> Result<(), GradebookError> {
    if !calc::in_range(weight, 0.0, calc::FULL_WEIGHT) {
        return Err(GradebookError::validation(
            "weight",
            format!("{} outside 0-100", weight),
        ));
    }
    Ok(())
}

impl Gradebook {
    /// `custom_grade_bands` starts with an empty band table instead of A-F.
    pub fn new(custom_grade_bands: bool) -> Self {
        Self {
            id: GradebookId::new(),
            categories: BTreeMap::new(),
            class_average: None,
            weights_valid: false,
            grade_bands: if custom_grade_bands {
                Vec::new()
            } else {
                default_grade_bands()
            },
        }
    }

    pub fn id(&self) -> GradebookId {
        self.id
    }

    // ------------------------------------------------------------------
    // Registration

    /// Registers `category`, or refreshes it when the name is already known.
    ///
    /// Passing weight 0 for a known name keeps the stored weight.
    pub fn add_category(&mut self, mut category: Category, weight: f64) -> Result<(), GradebookError> {
        validate_weight(weight)?;
        let name = category.name().to_string();
        let weight = match self.categories.get(&name) {
            Some(existing) if weight == 0.0 => existing.weight,
            _ => weight,
        };

        category.set_owner(Some(self.id));
        let cached_average = category.average();
        self.categories.insert(
            name,
            CategoryEntry {
                category,
                cached_average,
                weight,
            },
        );
        self.weight_validity_check();
        self.update_class_average();
        Ok(())
    }

    /// Builds a category and registers it in one step.
    pub fn create_category(
        &mut self,
        name: &str,
        average: Option<f64>,
        weight: f64,
    ) -> Result<(), GradebookError> {
        validate_weight(weight)?;
        let category = Category::new(name, average)?;
        self.add_category(category, weight)
    }

    /// Detaches a category; the returned value no longer names an owner.
    pub fn remove_category(&mut self, name: &str) -> Result<Category, GradebookError> {
        let Some(entry) = self.categories.remove(name) else {
            return Err(GradebookError::not_found("category", name));
        };
        let mut category = entry.category;
        category.set_owner(None);
        self.weight_validity_check();
        self.update_class_average();
        Ok(category)
    }

    pub fn set_weight(&mut self, name: &str, weight: f64) -> Result<(), GradebookError> {
        validate_weight(weight)?;
        let Some(entry) = self.categories.get_mut(name) else {
            return Err(GradebookError::not_found("category", name));
        };
        entry.weight = weight;
        self.weight_validity_check();
        self.update_class_average();
        Ok(())
    }

    /// Renames a registered category and moves its key in the same step.
    pub fn rename_category(&mut self, name: &str, new_name: &str) -> Result<(), GradebookError> {
        if !self.categories.contains_key(name) {
            return Err(GradebookError::not_found("category", name));
        }
        let new_key = validate_name("name", new_name)?;
        let new_key = new_key.as_str();
        if new_key == name {
            return Ok(());
        }
        if self.categories.contains_key(new_key) {
            return Err(GradebookError::validation(
                "name",
                format!("category {:?} already exists", new_key),
            ));
        }
        let Some(mut entry) = self.categories.remove(name) else {
            return Err(GradebookError::not_found("category", name));
        };
        if let Err(e) = entry.category.rename(new_key) {
            self.categories.insert(name.to_string(), entry);
            return Err(e);
        }
        self.categories.insert(new_key.to_string(), entry);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Category mutations (applied to the owned category, then refreshed)

    pub fn add_grade(
        &mut self,
        category: &str,
        assignment: &str,
        score: f64,
        date: Option<AssignmentDate>,
    ) -> Result<(), GradebookError> {
        self.with_category(category, |c| c.add_grade(assignment, score, date))
    }

    pub fn remove_grade(&mut self, category: &str, assignment: &str) -> Result<Assignment, GradebookError> {
        self.with_category(category, |c| c.remove_grade(assignment))
    }

    pub fn force_average(&mut self, category: &str, value: f64) -> Result<ForcedAverage, GradebookError> {
        self.with_category(category, |c| c.force_average(value))
    }

    pub fn resume_auto_average(&mut self, category: &str) -> Result<(), GradebookError> {
        self.with_category(category, |c| {
            c.resume_auto_average();
            Ok(())
        })
    }

    fn with_category<T, F>(&mut self, name: &str, f: F) -> Result<T, GradebookError>
    where
        F: FnOnce(&mut Category) -> Result<T, GradebookError>,
    {
        let Some(entry) = self.categories.get_mut(name) else {
            return Err(GradebookError::not_found("category", name));
        };
        let out = f(&mut entry.category)?;
        entry.cached_average = entry.category.average();
        self.update_class_average();
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Queries

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.get(name).map(|e| &e.category)
    }

    pub fn weight(&self, name: &str) -> Option<f64> {
        self.categories.get(name).map(|e| e.weight)
    }

    /// Copy of the registered categories, keyed by name.
    pub fn categories(&self) -> BTreeMap<String, CategoryEntry> {
        self.categories.clone()
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(|k| k.as_str())
    }

    pub fn class_average(&self) -> Option<f64> {
        self.class_average
    }

    /// Class average, or the reason there is none.
    pub fn require_class_average(&self) -> Result<f64, GradebookError> {
        match self.class_average {
            Some(v) if self.weights_valid => Ok(v),
            _ => Err(GradebookError::Configuration(format!(
                "category weights add up to {}, not 100",
                self.total_weight()
            ))),
        }
    }

    pub fn weights_valid(&self) -> bool {
        self.weights_valid
    }

    pub fn total_weight(&self) -> f64 {
        self.categories.values().map(|e| e.weight).sum()
    }

    /// Re-derives the weight flag from the registered weights.
    ///
    /// The total must be 100 within `calc::WEIGHT_EPSILON` (1e-9), not
    /// bit-for-bit, so decimal weights like 33.3/33.3/33.4 pass.
    pub fn weight_validity_check(&mut self) -> bool {
        self.weights_valid = calc::is_full_weight(self.total_weight());
        self.weights_valid
    }

    // ------------------------------------------------------------------
    // Grade bands

    pub fn grade_bands(&self) -> Vec<GradeBand> {
        self.grade_bands.clone()
    }

    /// Replaces the band for `letter` in place, or appends a new one.
    pub fn set_grade_band(&mut self, letter: &str, min: f64, max: f64) -> Result<(), GradebookError> {
        let band = GradeBand::new(letter, min, max)?;
        match self.grade_bands.iter_mut().find(|b| b.letter == band.letter) {
            Some(existing) => *existing = band,
            None => self.grade_bands.push(band),
        }
        Ok(())
    }

    pub fn remove_grade_band(&mut self, letter: &str) -> Result<GradeBand, GradebookError> {
        let letter = letter.trim();
        let Some(pos) = self.grade_bands.iter().position(|b| b.letter == letter) else {
            return Err(GradebookError::not_found("grade band", letter));
        };
        Ok(self.grade_bands.remove(pos))
    }

    /// First band (table order) containing the class average.
    pub fn letter_grade(&self) -> Option<&str> {
        let avg = self.class_average?;
        self.grade_bands
            .iter()
            .find(|b| b.contains(avg))
            .map(|b| b.letter.as_str())
    }

    // ------------------------------------------------------------------
    // Projection

    /// Class average if one more assignment scored 0, 100 and, optionally,
    /// `hypothetical` in `category`. The category is left exactly as it was.
    pub fn project(
        &mut self,
        category: &str,
        hypothetical: Option<f64>,
    ) -> Result<Projection, GradebookError> {
        let Some(entry) = self.categories.get(category) else {
            return Err(GradebookError::not_found("category", category));
        };

        let mut sentinel = PROJECTION_SENTINEL.to_string();
        while entry.category.assignment(&sentinel).is_some() {
            sentinel.push('_');
        }

        let project_one = |score: f64| -> Result<Option<f64>, GradebookError> {
            let mut trial = entry.category.clone();
            trial.add_grade(&sentinel, score, None)?;
            Ok(self.class_average_with(category, trial.average()))
        };

        let minimum = project_one(0.0)?;
        let maximum = project_one(100.0)?;
        let hypothetical = match hypothetical {
            Some(score) => Some(HypotheticalProjection {
                score,
                class_average: project_one(score)?,
            }),
            None => None,
        };

        tracing::debug!(
            category,
            ?minimum,
            ?maximum,
            hypothetical = ?hypothetical.map(|h| h.class_average),
            "class average projected"
        );

        // Re-register from the untouched entry so the cached view is current.
        self.with_category(category, |_| Ok(()))?;

        Ok(Projection {
            minimum,
            maximum,
            hypothetical,
        })
    }

    fn class_average_with(&self, name: &str, substitute: Option<f64>) -> Option<f64> {
        if !self.weights_valid {
            return None;
        }
        let total: f64 = self
            .categories
            .iter()
            .map(|(key, e)| {
                let avg = if key == name { substitute } else { e.cached_average };
                calc::weighted_contribution(avg, e.weight)
            })
            .sum();
        Some(calc::round_2_decimals(total))
    }

    fn update_class_average(&mut self) {
        if !self.weights_valid {
            tracing::debug!(
                gradebook = %self.id,
                total_weight = self.total_weight(),
                "category weights do not add up to 100; class average cleared"
            );
            self.class_average = None;
            return;
        }
        let total: f64 = self
            .categories
            .values()
            .map(|e| calc::weighted_contribution(e.cached_average, e.weight))
            .sum();
        self.class_average = Some(calc::round_2_decimals(total));
    }
}

impl fmt::Display for Gradebook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.category_names().collect();
        write!(f, "categories: [{}], class average: ", names.join(", "))?;
        match self.class_average {
            Some(v) => write!(f, "{:.2}", v),
            None => write!(f, "none"),
        }
    }
}
