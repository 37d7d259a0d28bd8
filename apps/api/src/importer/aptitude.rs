use std::path::Path;

use serde::Deserialize;

use super::csv_rows::{optional, read_rows, required, FieldError, RowSet};
use super::{DatasetParser, FileSpec, ImportError};
use crate::models::catalog::{
    AnswerOption, AptitudeCategory, AptitudePracticeSet, AptitudeProblem, AptitudeProblemRef,
    AptitudeTopic, CatalogRecord, Difficulty,
};

pub const FILES: &[FileSpec] = &[
    FileSpec {
        name: "categories.csv",
        required: false,
    },
    FileSpec {
        name: "topics.csv",
        required: false,
    },
    FileSpec {
        name: "problems.csv",
        required: true,
    },
    FileSpec {
        name: "practice_sets.csv",
        required: false,
    },
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoryRow {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TopicRow {
    category_name: Option<String>,
    name: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProblemRow {
    category_name: Option<String>,
    topic_name: Option<String>,
    question_text: Option<String>,
    option_a: Option<String>,
    option_b: Option<String>,
    option_c: Option<String>,
    option_d: Option<String>,
    correct_option: Option<String>,
    explanation: Option<String>,
    difficulty: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PracticeSetRow {
    title: Option<String>,
    description: Option<String>,
    problem_ids: Option<String>,
}

fn category(row: CategoryRow) -> Result<CatalogRecord, FieldError> {
    Ok(CatalogRecord::AptitudeCategory(AptitudeCategory {
        name: required(row.name, "name")?,
        description: optional(row.description),
    }))
}

fn topic(row: TopicRow) -> Result<CatalogRecord, FieldError> {
    Ok(CatalogRecord::AptitudeTopic(AptitudeTopic {
        category_name: required(row.category_name, "category_name")?,
        name: required(row.name, "name")?,
        description: optional(row.description),
    }))
}

fn problem(row: ProblemRow) -> Result<AptitudeProblem, FieldError> {
    let category_name = required(row.category_name, "category_name")?;
    let topic_name = required(row.topic_name, "topic_name")?;
    let question_text = required(row.question_text, "question_text")?;
    let options = [
        required(row.option_a, "option_a")?,
        required(row.option_b, "option_b")?,
        required(row.option_c, "option_c")?,
        required(row.option_d, "option_d")?,
    ];
    let correct_option = required(row.correct_option, "correct_option")?
        .parse::<AnswerOption>()
        .map_err(|e: String| FieldError::new("correct_option", e))?;
    let difficulty = match row.difficulty.filter(|d| !d.is_empty()) {
        None => Difficulty::Medium,
        Some(raw) => raw
            .parse::<Difficulty>()
            .map_err(|e: String| FieldError::new("difficulty", e))?,
    };

    Ok(AptitudeProblem {
        category_name,
        topic_name,
        question_text,
        options,
        correct_option,
        explanation: optional(row.explanation),
        difficulty,
    })
}

/// Categories, topics, multiple-choice problems and practice sets. Parents named
/// by a row but absent from their own file are created by the store.
///
/// A practice set lists problems by their 1-based data row in `problems.csv`,
/// which is the id a fresh import assigns them.
#[derive(Debug, Default)]
pub struct AptitudeParser {
    /// Indexed by data row; `None` where the row was rejected.
    problems: Vec<Option<AptitudeProblemRef>>,
}

impl AptitudeParser {
    fn practice_set(&self, row: PracticeSetRow) -> Result<CatalogRecord, FieldError> {
        let title = required(row.title, "title")?;
        let mut problems: Vec<AptitudeProblemRef> = Vec::new();
        for raw in optional(row.problem_ids).split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let position = raw
                .parse::<usize>()
                .ok()
                .filter(|&p| p >= 1)
                .ok_or_else(|| FieldError::new("problem_ids", format!("'{raw}' is not a problem id")))?;
            let problem = self
                .problems
                .get(position - 1)
                .cloned()
                .flatten()
                .ok_or_else(|| {
                    FieldError::new(
                        "problem_ids",
                        format!("problem {position} was not imported from problems.csv"),
                    )
                })?;
            if !problems.contains(&problem) {
                problems.push(problem);
            }
        }

        Ok(CatalogRecord::AptitudePracticeSet(AptitudePracticeSet {
            title,
            description: optional(row.description),
            problems,
        }))
    }
}

impl DatasetParser for AptitudeParser {
    fn parse_file(&mut self, file: &str, path: &Path) -> Result<RowSet<CatalogRecord>, ImportError> {
        match file {
            "categories.csv" => read_rows(path, &["name"], category),
            "topics.csv" => read_rows(path, &["category_name", "name"], topic),
            "practice_sets.csv" => read_rows(path, &["title"], |row: PracticeSetRow| {
                self.practice_set(row)
            }),
            _ => {
                let set = read_rows(
                    path,
                    &[
                        "category_name",
                        "topic_name",
                        "question_text",
                        "option_a",
                        "option_b",
                        "option_c",
                        "option_d",
                        "correct_option",
                    ],
                    problem,
                )?;
                self.problems = vec![None; set.rows];
                for (row, p) in &set.valid {
                    if let Some(slot) = self.problems.get_mut(row - 2) {
                        *slot = Some(p.reference());
                    }
                }
                Ok(RowSet {
                    rows: set.rows,
                    valid: set
                        .valid
                        .into_iter()
                        .map(|(row, p)| (row, CatalogRecord::AptitudeProblem(p)))
                        .collect(),
                    errors: set.errors,
                })
            }
        }
    }
}
