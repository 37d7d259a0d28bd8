use std::path::Path;

use serde::Deserialize;

use super::csv_rows::{optional, parse_int_or, read_rows, required, FieldError, RowSet};
use super::{DatasetParser, ImportError};
use crate::models::catalog::{
    slugify, Article, CatalogRecord, CodeSnippet, ContentLesson, QuizQuestion,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LessonRow {
    topic_name: Option<String>,
    topic_slug: Option<String>,
    topic_description: Option<String>,
    lesson_title: Option<String>,
    lesson_content: Option<String>,
    lesson_order: Option<String>,
    question_text: Option<String>,
    option_1: Option<String>,
    option_2: Option<String>,
    option_3: Option<String>,
    option_4: Option<String>,
    correct_option: Option<String>,
    explanation: Option<String>,
    code_lang_1: Option<String>,
    code_1: Option<String>,
    code_lang_2: Option<String>,
    code_2: Option<String>,
    code_lang_3: Option<String>,
    code_3: Option<String>,
    article_title: Option<String>,
    article_category: Option<String>,
    article_content: Option<String>,
}

fn question(row: &mut LessonRow) -> Result<Option<QuizQuestion>, FieldError> {
    let Some(text) = row.question_text.take().filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let options = [
        required(row.option_1.take(), "option_1")?,
        required(row.option_2.take(), "option_2")?,
        required(row.option_3.take(), "option_3")?,
        required(row.option_4.take(), "option_4")?,
    ];
    let raw = required(row.correct_option.take(), "correct_option")?;
    let correct_option = match raw.parse::<u8>() {
        Ok(n @ 1..=4) => n,
        _ => {
            return Err(FieldError::new(
                "correct_option",
                format!("'{raw}' is not an option number between 1 and 4"),
            ))
        }
    };
    Ok(Some(QuizQuestion {
        text,
        options,
        correct_option,
        explanation: optional(row.explanation.take()),
    }))
}

fn snippets(row: &mut LessonRow) -> Result<Vec<CodeSnippet>, FieldError> {
    let pairs = [
        ("code_lang_1", row.code_lang_1.take(), row.code_1.take()),
        ("code_lang_2", row.code_lang_2.take(), row.code_2.take()),
        ("code_lang_3", row.code_lang_3.take(), row.code_3.take()),
    ];
    let mut out = Vec::new();
    for (lang_column, language, code) in pairs {
        let Some(code) = code.filter(|c| !c.is_empty()) else {
            continue;
        };
        out.push(CodeSnippet {
            language: required(language, lang_column)?.to_ascii_lowercase(),
            code,
        });
    }
    Ok(out)
}

fn article(row: &mut LessonRow) -> Result<Option<Article>, FieldError> {
    let Some(title) = row.article_title.take().filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let slug = slugify(&title);
    if slug.is_empty() {
        return Err(FieldError::new(
            "article_title",
            "title has no characters usable in a slug",
        ));
    }
    Ok(Some(Article {
        slug,
        title,
        category: optional(row.article_category.take()),
        content: required(row.article_content.take(), "article_content")?,
    }))
}

fn lesson(mut row: LessonRow) -> Result<CatalogRecord, FieldError> {
    let topic_name = required(row.topic_name.take(), "topic_name")?;
    let topic_slug = match row.topic_slug.take().filter(|s| !s.is_empty()) {
        Some(slug) => slug,
        None => slugify(&topic_name),
    };
    if topic_slug.is_empty() {
        return Err(FieldError::new("topic_slug", "cannot derive a slug from topic_name"));
    }
    let title = required(row.lesson_title.take(), "lesson_title")?;
    let content = required(row.lesson_content.take(), "lesson_content")?;
    let order = parse_int_or(row.lesson_order.take(), "lesson_order", 0)?;

    Ok(CatalogRecord::ContentLesson(ContentLesson {
        topic_name,
        topic_slug,
        topic_description: optional(row.topic_description.take()),
        title,
        content,
        order,
        question: question(&mut row)?,
        snippets: snippets(&mut row)?,
        article: article(&mut row)?,
    }))
}

/// One lesson per row, carrying its topic, optional quiz question, up to three
/// code snippets and an optional article.
#[derive(Debug, Default)]
pub struct ContentParser;

impl DatasetParser for ContentParser {
    fn parse_file(&mut self, _file: &str, path: &Path) -> Result<RowSet<CatalogRecord>, ImportError> {
        read_rows(path, &["topic_name", "lesson_title", "lesson_content"], lesson)
    }
}
