//! Reader and writer for `.gb` gradebook files.
//!
//! A file is a list of sections separated by `****`:
//!
//! ```text
//! custom            <- section 1: `default` or `custom`
//! A,90,100          <- custom only: letter,min,max
//! ****
//! HW                <- category name
//! 20                <- weight
//! auto              <- `auto` or `manual:<average>`
//! HW1,95            <- name,score[,month/day/year]
//! ```
//!
//! Loading is all-or-nothing: the gradebook is only returned once every
//! section has been accepted.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;

use crate::category::{AssignmentDate, Category};
use crate::error::LoadError;
use crate::gradebook::{default_grade_bands, Gradebook};

pub const SECTION_DELIMITER: &str = "****";

const GRADE_SYSTEM_DEFAULT: &str = "default";
const GRADE_SYSTEM_CUSTOM: &str = "custom";
const AVERAGE_AUTO: &str = "auto";
const AVERAGE_MANUAL_PREFIX: &str = "manual:";

/// Splits on `****` and drops blank lines at both ends of every section.
pub fn split_sections(text: &str) -> Vec<Vec<String>> {
    text.split(SECTION_DELIMITER)
        .map(|section| {
            let mut lines: Vec<String> = section
                .lines()
                .map(|l| l.trim_end_matches('\r').to_string())
                .collect();
            while lines.last().map(|l| l.trim().is_empty()).unwrap_or(false) {
                lines.pop();
            }
            let leading = lines.iter().take_while(|l| l.trim().is_empty()).count();
            lines.drain(..leading);
            lines
        })
        .collect()
}

pub fn parse_gradebook(text: &str) -> Result<Gradebook, LoadError> {
    let sections = split_sections(text);
    let Some((header, category_sections)) = sections.split_first() else {
        return Err(LoadError::SectionCount {
            section: 1,
            message: "file has no sections".to_string(),
        });
    };

    let mut gb = parse_header(header)?;

    let mut seen: HashSet<String> = HashSet::new();
    for (i, lines) in category_sections.iter().enumerate() {
        let section = i + 2;
        if lines.is_empty() {
            return Err(LoadError::SectionCount {
                section,
                message: "empty category section".to_string(),
            });
        }
        let (category, weight) = parse_category(section, lines)?;
        if !seen.insert(category.name().to_string()) {
            return Err(LoadError::DuplicateCategory {
                section,
                name: category.name().to_string(),
            });
        }
        gb.add_category(category, weight)
            .map_err(|source| LoadError::Rejected { section, source })?;
    }

    gb.weight_validity_check();
    Ok(gb)
}

fn parse_header(lines: &[String]) -> Result<Gradebook, LoadError> {
    let mut it = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty());
    let Some(system) = it.next() else {
        return Err(LoadError::MissingField {
            section: 1,
            field: "grade system",
        });
    };

    if system.eq_ignore_ascii_case(GRADE_SYSTEM_DEFAULT) {
        if let Some(extra) = it.next() {
            return Err(LoadError::BadFlag {
                section: 1,
                field: "grade band (default grade system takes none)",
                value: extra.to_string(),
            });
        }
        return Ok(Gradebook::new(false));
    }
    if !system.eq_ignore_ascii_case(GRADE_SYSTEM_CUSTOM) {
        return Err(LoadError::BadFlag {
            section: 1,
            field: "grade system",
            value: system.to_string(),
        });
    }

    let mut gb = Gradebook::new(true);
    for line in it {
        let parts: Vec<&str> = line.split(',').map(|x| x.trim()).collect();
        if parts.len() != 3 {
            return Err(LoadError::MissingField {
                section: 1,
                field: "grade band letter,min,max",
            });
        }
        let min = parse_number(1, "grade band min", parts[1])?;
        let max = parse_number(1, "grade band max", parts[2])?;
        gb.set_grade_band(parts[0], min, max)
            .map_err(|source| LoadError::Rejected { section: 1, source })?;
    }
    Ok(gb)
}

fn parse_category(section: usize, lines: &[String]) -> Result<(Category, f64), LoadError> {
    let mut it = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty());

    let name = it.next().ok_or(LoadError::MissingField {
        section,
        field: "category name",
    })?;
    let weight_line = it.next().ok_or(LoadError::MissingField {
        section,
        field: "weight",
    })?;
    let weight = parse_number(section, "weight", weight_line)?;
    let mode = it.next().ok_or(LoadError::MissingField {
        section,
        field: "average mode",
    })?;

    let manual_average = if mode.eq_ignore_ascii_case(AVERAGE_AUTO) {
        None
    } else if let Some(v) = strip_prefix_ignore_case(mode, AVERAGE_MANUAL_PREFIX) {
        Some(parse_number(section, "manual average", v.trim())?)
    } else {
        return Err(LoadError::BadFlag {
            section,
            field: "average mode",
            value: mode.to_string(),
        });
    };

    let mut category = Category::new(name, manual_average)
        .map_err(|source| LoadError::Rejected { section, source })?;

    for line in it {
        let (assignment, score, date) = parse_assignment(section, line)?;
        category
            .add_grade(&assignment, score, date)
            .map_err(|source| LoadError::Rejected { section, source })?;
    }

    Ok((category, weight))
}

/// `name,score[,month/day/year]`; the name may itself contain commas.
fn parse_assignment(
    section: usize,
    line: &str,
) -> Result<(String, f64, Option<AssignmentDate>), LoadError> {
    let mut parts: Vec<&str> = line.split(',').collect();
    let date = match parts.last() {
        Some(last) if last.contains('/') => {
            let raw = *last;
            parts.pop();
            let d = raw.parse::<AssignmentDate>().map_err(|_| LoadError::BadDate {
                section,
                value: raw.trim().to_string(),
            })?;
            Some(d)
        }
        _ => None,
    };
    if parts.len() < 2 {
        return Err(LoadError::MissingField {
            section,
            field: "assignment name,score",
        });
    }
    let score_raw = parts.pop().unwrap_or_default();
    let score = parse_number(section, "score", score_raw.trim())?;
    let name = parts.join(",").trim().to_string();
    Ok((name, score, date))
}

fn parse_number(section: usize, field: &'static str, raw: &str) -> Result<f64, LoadError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(LoadError::BadNumber {
            section,
            field,
            value: raw.to_string(),
        }),
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Renders a gradebook in the `.gb` format `parse_gradebook` reads.
pub fn write_gradebook(gb: &Gradebook) -> String {
    let mut out = String::new();
    let bands = gb.grade_bands();
    if bands == default_grade_bands() {
        out.push_str(GRADE_SYSTEM_DEFAULT);
        out.push('\n');
    } else {
        out.push_str(GRADE_SYSTEM_CUSTOM);
        out.push('\n');
        for b in &bands {
            out.push_str(&format!("{},{},{}\n", b.letter, b.min, b.max));
        }
    }

    for (name, entry) in gb.categories() {
        out.push_str(SECTION_DELIMITER);
        out.push('\n');
        out.push_str(&name);
        out.push('\n');
        out.push_str(&format!("{}\n", entry.weight));
        let category = &entry.category;
        match (category.is_manual(), category.average()) {
            (true, Some(avg)) => out.push_str(&format!("{}{}\n", AVERAGE_MANUAL_PREFIX, avg)),
            _ => {
                out.push_str(AVERAGE_AUTO);
                out.push('\n');
            }
        }
        for (assignment, a) in category.assignments() {
            match a.date {
                Some(d) => out.push_str(&format!("{},{},{}\n", assignment, a.score, d)),
                None => out.push_str(&format!("{},{}\n", assignment, a.score)),
            }
        }
    }
    out
}

pub fn load_gradebook_file(path: &Path) -> Result<Gradebook, LoadError> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let gb = parse_gradebook(&text)?;
    tracing::info!(
        path = %path.display(),
        gradebook = %gb.id(),
        categories = gb.categories().len(),
        weights_valid = gb.weights_valid(),
        "gradebook loaded"
    );
    Ok(gb)
}

/// Writes to `<path>.gb.tmp` and renames over `path`.
pub fn save_gradebook_file(gb: &Gradebook, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.to_string_lossy()))?;
        }
    }
    let tmp = path.with_extension("gb.tmp");
    std::fs::write(&tmp, write_gradebook(gb))
        .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| {
            format!(
                "failed to move {} to {}",
                tmp.to_string_lossy(),
                path.to_string_lossy()
            )
        });
    }
    tracing::info!(path = %path.display(), gradebook = %gb.id(), "gradebook saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_trimmed_of_blank_edges() {
        let sections = split_sections("default\n\n****\n\n\nHW\n20\n\nauto\n\n\n****\nQuiz\n");
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0], vec!["default".to_string()]);
        assert_eq!(
            sections[1],
            vec!["HW".to_string(), "20".to_string(), "".to_string(), "auto".to_string()]
        );
        assert_eq!(sections[2], vec!["Quiz".to_string()]);
    }

    #[test]
    fn assignment_names_may_contain_commas() {
        let (name, score, date) = parse_assignment(2, "Essay, part 2,88.5,3/4/2020").expect("parse");
        assert_eq!(name, "Essay, part 2");
        assert_eq!(score, 88.5);
        assert_eq!(date, Some(AssignmentDate::new(3, 4, 2020).expect("date")));

        let (name, score, date) = parse_assignment(2, "Lab 1,70").expect("parse");
        assert_eq!(name, "Lab 1");
        assert_eq!(score, 70.0);
        assert_eq!(date, None);
    }

    #[test]
    fn assignment_line_errors() {
        assert!(matches!(
            parse_assignment(4, "Lab 1"),
            Err(LoadError::MissingField { section: 4, .. })
        ));
        assert!(matches!(
            parse_assignment(4, "Lab 1,ninety"),
            Err(LoadError::BadNumber { section: 4, field: "score", .. })
        ));
        assert!(matches!(
            parse_assignment(4, "Lab 1,90,0/4/2020"),
            Err(LoadError::BadDate { section: 4, .. })
        ));
    }

    #[test]
    fn manual_prefix_is_case_insensitive() {
        assert_eq!(strip_prefix_ignore_case("Manual:91.5", "manual:"), Some("91.5"));
        assert_eq!(strip_prefix_ignore_case("man", "manual:"), None);
        assert_eq!(strip_prefix_ignore_case("autoé", "manual:"), None);
    }

    #[test]
    fn header_rejects_unknown_system_and_extra_default_lines() {
        assert!(matches!(
            parse_gradebook("percent\n"),
            Err(LoadError::BadFlag { section: 1, .. })
        ));
        assert!(matches!(
            parse_gradebook("default\nA,90,100\n"),
            Err(LoadError::BadFlag { section: 1, .. })
        ));
        assert!(matches!(
            parse_gradebook("\n\n"),
            Err(LoadError::MissingField { section: 1, .. })
        ));
    }
}
