use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use super::csv_rows::{
    optional, parse_bool, parse_int_or, parse_positive_int, read_rows, required, split_list,
    FieldError, RowSet,
};
use super::{DatasetParser, FileSpec, ImportError};
use crate::models::catalog::{
    slugify, CatalogRecord, CodeTemplate, Difficulty, Editorial, PracticeCompany,
    PracticeProblem, PracticeTestCase, PracticeTopic,
};

pub const FILES: &[FileSpec] = &[
    FileSpec {
        name: "topics.csv",
        required: false,
    },
    FileSpec {
        name: "companies.csv",
        required: false,
    },
    FileSpec {
        name: "problems.csv",
        required: true,
    },
    FileSpec {
        name: "test_cases.csv",
        required: false,
    },
    FileSpec {
        name: "code_templates.csv",
        required: false,
    },
    FileSpec {
        name: "editorials.csv",
        required: false,
    },
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TopicRow {
    name: Option<String>,
    slug: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CompanyRow {
    name: Option<String>,
    slug: Option<String>,
    website: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProblemRow {
    problem_number: Option<String>,
    title: Option<String>,
    difficulty: Option<String>,
    description: Option<String>,
    constraints: Option<String>,
    example_input: Option<String>,
    example_output: Option<String>,
    example_explanation: Option<String>,
    hints: Option<String>,
    time_complexity: Option<String>,
    space_complexity: Option<String>,
    topics: Option<String>,
    companies: Option<String>,
    is_active: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TestCaseRow {
    problem_number: Option<String>,
    input_data: Option<String>,
    expected_output: Option<String>,
    is_sample: Option<String>,
    explanation: Option<String>,
    order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TemplateRow {
    problem_number: Option<String>,
    language: Option<String>,
    template_code: Option<String>,
    solution_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EditorialRow {
    problem_number: Option<String>,
    approach: Option<String>,
    complexity_analysis: Option<String>,
    code_explanation: Option<String>,
    video_url: Option<String>,
}

/// Blank slugs are derived from the name.
fn slug_or_derived(slug: Option<String>, name: &str) -> Result<String, FieldError> {
    let slug = match slug.filter(|s| !s.is_empty()) {
        Some(given) => slugify(&given),
        None => slugify(name),
    };
    if slug.is_empty() {
        return Err(FieldError::new("slug", format!("cannot derive a slug from '{name}'")));
    }
    Ok(slug)
}

fn topic(row: TopicRow) -> Result<CatalogRecord, FieldError> {
    let name = required(row.name, "name")?;
    Ok(CatalogRecord::PracticeTopic(PracticeTopic {
        slug: slug_or_derived(row.slug, &name)?,
        name,
        description: optional(row.description),
    }))
}

fn company(row: CompanyRow) -> Result<CatalogRecord, FieldError> {
    let name = required(row.name, "name")?;
    let website = optional(row.website);
    if !website.is_empty() && !website.starts_with("http://") && !website.starts_with("https://") {
        return Err(FieldError::new("website", format!("'{website}' is not an http(s) URL")));
    }
    Ok(CatalogRecord::PracticeCompany(PracticeCompany {
        slug: slug_or_derived(row.slug, &name)?,
        name,
        website,
    }))
}

fn problem(row: ProblemRow) -> Result<PracticeProblem, FieldError> {
    let problem_number = parse_positive_int(row.problem_number, "problem_number")?;
    let title = required(row.title, "title")?;
    let difficulty = match row.difficulty.filter(|d| !d.is_empty()) {
        None => Difficulty::Medium,
        Some(raw) => raw
            .parse::<Difficulty>()
            .map_err(|e: String| FieldError::new("difficulty", e))?,
    };

    Ok(PracticeProblem {
        problem_number,
        title,
        difficulty,
        description: optional(row.description),
        constraints: optional(row.constraints),
        example_input: optional(row.example_input),
        example_output: optional(row.example_output),
        example_explanation: optional(row.example_explanation),
        hints: optional(row.hints),
        time_complexity: optional(row.time_complexity),
        space_complexity: optional(row.space_complexity),
        topics: split_list(row.topics),
        companies: split_list(row.companies),
        is_active: parse_bool(row.is_active, "is_active", true)?,
    })
}

/// Topic and company tags, then problems, then their test cases, code templates
/// and editorials. Child rows may only point at problems that the same run's
/// `problems.csv` defines.
#[derive(Debug, Default)]
pub struct PracticeParser {
    known_problems: HashSet<i32>,
    next_case_order: HashMap<i32, i32>,
}

impl PracticeParser {
    fn parent(&self, raw: Option<String>) -> Result<i32, FieldError> {
        let number = parse_positive_int(raw, "problem_number")?;
        if !self.known_problems.contains(&number) {
            return Err(FieldError::new(
                "problem_number",
                format!("problem {number} is not defined in problems.csv"),
            ));
        }
        Ok(number)
    }

    fn test_case(&mut self, row: TestCaseRow) -> Result<CatalogRecord, FieldError> {
        let problem_number = self.parent(row.problem_number)?;
        let expected_output = required(row.expected_output, "expected_output")?;
        let counter = self.next_case_order.entry(problem_number).or_insert(1);
        let order = parse_int_or(row.order, "order", *counter)?;
        *counter = (*counter).max(order + 1);

        Ok(CatalogRecord::PracticeTestCase(PracticeTestCase {
            problem_number,
            order,
            input_data: optional(row.input_data),
            expected_output,
            is_sample: parse_bool(row.is_sample, "is_sample", false)?,
            explanation: optional(row.explanation),
        }))
    }

    fn template(&self, row: TemplateRow) -> Result<CatalogRecord, FieldError> {
        let problem_number = self.parent(row.problem_number)?;
        Ok(CatalogRecord::CodeTemplate(CodeTemplate {
            problem_number,
            language: required(row.language, "language")?.to_ascii_lowercase(),
            template_code: required(row.template_code, "template_code")?,
            solution_code: optional(row.solution_code),
        }))
    }

    fn editorial(&self, row: EditorialRow) -> Result<CatalogRecord, FieldError> {
        let problem_number = self.parent(row.problem_number)?;
        Ok(CatalogRecord::Editorial(Editorial {
            problem_number,
            approach: required(row.approach, "approach")?,
            complexity_analysis: optional(row.complexity_analysis),
            code_explanation: optional(row.code_explanation),
            video_url: optional(row.video_url),
        }))
    }
}

impl DatasetParser for PracticeParser {
    fn parse_file(&mut self, file: &str, path: &Path) -> Result<RowSet<CatalogRecord>, ImportError> {
        match file {
            "topics.csv" => read_rows(path, &["name"], topic),
            "companies.csv" => read_rows(path, &["name"], company),
            "editorials.csv" => read_rows(
                path,
                &["problem_number", "approach"],
                |row: EditorialRow| self.editorial(row),
            ),
            "test_cases.csv" => read_rows(
                path,
                &["problem_number", "expected_output"],
                |row: TestCaseRow| self.test_case(row),
            ),
            "code_templates.csv" => read_rows(
                path,
                &["problem_number", "language", "template_code"],
                |row: TemplateRow| self.template(row),
            ),
            _ => {
                let set = read_rows(path, &["problem_number", "title"], problem)?;
                self.known_problems
                    .extend(set.valid.iter().map(|(_, p)| p.problem_number));
                Ok(RowSet {
                    rows: set.rows,
                    valid: set
                        .valid
                        .into_iter()
                        .map(|(row, p)| (row, CatalogRecord::PracticeProblem(p)))
                        .collect(),
                    errors: set.errors,
                })
            }
        }
    }
}
