//! Typed catalog records produced by the CSV importer.
//!
//! Every record knows its table and its natural key, the field combination that
//! identifies "the same record" across import runs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Aptitude,
    Practice,
    Content,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Aptitude => "aptitude",
            DatasetKind::Practice => "practice",
            DatasetKind::Content => "content",
        }
    }

    /// Tables owned by this dataset, parents first.
    pub fn tables(&self) -> &'static [RecordTable] {
        match self {
            DatasetKind::Aptitude => &[
                RecordTable::AptitudeCategories,
                RecordTable::AptitudeTopics,
                RecordTable::AptitudeProblems,
                RecordTable::AptitudePracticeSets,
            ],
            DatasetKind::Practice => &[
                RecordTable::PracticeTopics,
                RecordTable::PracticeCompanies,
                RecordTable::PracticeProblems,
                RecordTable::PracticeTestCases,
                RecordTable::PracticeCodeTemplates,
                RecordTable::PracticeEditorials,
            ],
            DatasetKind::Content => &[RecordTable::ContentLessons],
        }
    }

    /// Key for the per-dataset advisory lock that serializes concurrent imports.
    pub fn lock_key(&self) -> i64 {
        match self {
            DatasetKind::Aptitude => 0x454c_0001,
            DatasetKind::Practice => 0x454c_0002,
            DatasetKind::Content => 0x454c_0003,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordTable {
    AptitudeCategories,
    AptitudeTopics,
    AptitudeProblems,
    AptitudePracticeSets,
    PracticeTopics,
    PracticeCompanies,
    PracticeProblems,
    PracticeTestCases,
    PracticeCodeTemplates,
    PracticeEditorials,
    ContentLessons,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{other}' (expected easy, medium or hard)")),
        }
    }
}

/// Correct answer of a four-option aptitude question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
            AnswerOption::D => "D",
        }
    }
}

impl FromStr for AnswerOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(AnswerOption::A),
            "B" => Ok(AnswerOption::B),
            "C" => Ok(AnswerOption::C),
            "D" => Ok(AnswerOption::D),
            other => Err(format!("invalid correct_option '{other}' (expected A-D)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AptitudeCategory {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AptitudeTopic {
    pub category_name: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AptitudeProblem {
    pub category_name: String,
    pub topic_name: String,
    pub question_text: String,
    pub options: [String; 4],
    pub correct_option: AnswerOption,
    pub explanation: String,
    pub difficulty: Difficulty,
}

impl AptitudeProblem {
    pub fn reference(&self) -> AptitudeProblemRef {
        AptitudeProblemRef {
            category_name: self.category_name.clone(),
            topic_name: self.topic_name.clone(),
            question_text: self.question_text.clone(),
        }
    }
}

/// Natural key of an aptitude problem, as held by practice sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AptitudeProblemRef {
    pub category_name: String,
    pub topic_name: String,
    pub question_text: String,
}

impl AptitudeProblemRef {
    pub fn natural_key(&self) -> String {
        join_key(&[&self.category_name, &self.topic_name, &self.question_text])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AptitudePracticeSet {
    pub title: String,
    pub description: String,
    /// In the order listed.
    pub problems: Vec<AptitudeProblemRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticeTopic {
    pub name: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticeCompany {
    pub name: String,
    pub slug: String,
    pub website: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticeProblem {
    pub problem_number: i32,
    pub title: String,
    pub difficulty: Difficulty,
    pub description: String,
    pub constraints: String,
    pub example_input: String,
    pub example_output: String,
    pub example_explanation: String,
    pub hints: String,
    pub time_complexity: String,
    pub space_complexity: String,
    pub topics: Vec<String>,
    pub companies: Vec<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticeTestCase {
    pub problem_number: i32,
    pub order: i32,
    pub input_data: String,
    pub expected_output: String,
    pub is_sample: bool,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeTemplate {
    pub problem_number: i32,
    pub language: String,
    pub template_code: String,
    pub solution_code: String,
}

/// At most one per problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Editorial {
    pub problem_number: i32,
    pub approach: String,
    pub complexity_analysis: String,
    pub code_explanation: String,
    pub video_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub text: String,
    pub options: [String; 4],
    /// 1-based index into `options`.
    pub correct_option: u8,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub language: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub category: String,
    pub content: String,
}

/// One row of the content CSV: a lesson plus its topic, quiz question, snippets and article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentLesson {
    pub topic_name: String,
    pub topic_slug: String,
    pub topic_description: String,
    pub title: String,
    pub content: String,
    pub order: i32,
    pub question: Option<QuizQuestion>,
    pub snippets: Vec<CodeSnippet>,
    pub article: Option<Article>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum CatalogRecord {
    AptitudeCategory(AptitudeCategory),
    AptitudeTopic(AptitudeTopic),
    AptitudeProblem(AptitudeProblem),
    AptitudePracticeSet(AptitudePracticeSet),
    PracticeTopic(PracticeTopic),
    PracticeCompany(PracticeCompany),
    PracticeProblem(PracticeProblem),
    PracticeTestCase(PracticeTestCase),
    CodeTemplate(CodeTemplate),
    Editorial(Editorial),
    ContentLesson(ContentLesson),
}

impl CatalogRecord {
    pub fn table(&self) -> RecordTable {
        match self {
            CatalogRecord::AptitudeCategory(_) => RecordTable::AptitudeCategories,
            CatalogRecord::AptitudeTopic(_) => RecordTable::AptitudeTopics,
            CatalogRecord::AptitudeProblem(_) => RecordTable::AptitudeProblems,
            CatalogRecord::AptitudePracticeSet(_) => RecordTable::AptitudePracticeSets,
            CatalogRecord::PracticeTopic(_) => RecordTable::PracticeTopics,
            CatalogRecord::PracticeCompany(_) => RecordTable::PracticeCompanies,
            CatalogRecord::PracticeProblem(_) => RecordTable::PracticeProblems,
            CatalogRecord::PracticeTestCase(_) => RecordTable::PracticeTestCases,
            CatalogRecord::CodeTemplate(_) => RecordTable::PracticeCodeTemplates,
            CatalogRecord::Editorial(_) => RecordTable::PracticeEditorials,
            CatalogRecord::ContentLesson(_) => RecordTable::ContentLessons,
        }
    }

    /// Natural key within the record's table. Components are joined with a unit
    /// separator so that no CSV value can forge a collision.
    pub fn natural_key(&self) -> String {
        match self {
            CatalogRecord::AptitudeCategory(c) => c.name.clone(),
            CatalogRecord::AptitudeTopic(t) => join_key(&[&t.category_name, &t.name]),
            CatalogRecord::AptitudeProblem(p) => p.reference().natural_key(),
            CatalogRecord::AptitudePracticeSet(s) => s.title.clone(),
            CatalogRecord::PracticeTopic(t) => t.name.clone(),
            CatalogRecord::PracticeCompany(c) => c.name.clone(),
            CatalogRecord::PracticeProblem(p) => p.problem_number.to_string(),
            CatalogRecord::PracticeTestCase(t) => {
                join_key(&[&t.problem_number.to_string(), &t.order.to_string()])
            }
            CatalogRecord::CodeTemplate(t) => {
                join_key(&[&t.problem_number.to_string(), &t.language])
            }
            CatalogRecord::Editorial(e) => e.problem_number.to_string(),
            CatalogRecord::ContentLesson(l) => join_key(&[&l.topic_slug, &l.title]),
        }
    }
}

fn join_key(parts: &[&str]) -> String {
    parts.join("\u{1f}")
}

/// Lowercase ASCII slug: alphanumerics kept, every other run collapsed to one dash.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("Big-O Notation: A Primer!"), "big-o-notation-a-primer");
        assert_eq!(slugify("  --Graphs & Trees--  "), "graphs-trees");
    }

    #[test]
    fn test_answer_option_is_case_insensitive() {
        assert_eq!("b".parse::<AnswerOption>().unwrap(), AnswerOption::B);
        assert!("E".parse::<AnswerOption>().is_err());
    }

    #[test]
    fn test_difficulty_accepts_capitalized() {
        assert_eq!("Hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_natural_key_ignores_non_key_fields() {
        let a = CatalogRecord::AptitudeTopic(AptitudeTopic {
            category_name: "Quantitative".into(),
            name: "Percentages".into(),
            description: "one".into(),
        });
        let b = CatalogRecord::AptitudeTopic(AptitudeTopic {
            category_name: "Quantitative".into(),
            name: "Percentages".into(),
            description: "two".into(),
        });
        assert_eq!(a.natural_key(), b.natural_key());
        assert_ne!(a, b);
    }

    #[test]
    fn test_dataset_tables_are_disjoint() {
        for table in DatasetKind::Aptitude.tables() {
            assert!(!DatasetKind::Practice.tables().contains(table));
            assert!(!DatasetKind::Content.tables().contains(table));
        }
    }

    #[test]
    fn test_new_tables_belong_to_their_dataset() {
        assert!(DatasetKind::Aptitude.tables().contains(&RecordTable::AptitudePracticeSets));
        for table in [
            RecordTable::PracticeTopics,
            RecordTable::PracticeCompanies,
            RecordTable::PracticeEditorials,
        ] {
            assert!(DatasetKind::Practice.tables().contains(&table));
        }
    }
}
