//! Raw store rows → tagged [`ContentRecord`]s.

use aitutor_shared::{ContentRecord, LessonFields, RawRow, RecordBody, SourceKind};

/// Keep only the fields that belong to the row's source.
///
/// Unknown source tags produce a record with the common fields only; this
/// never fails.
pub fn normalize(row: RawRow) -> ContentRecord {
    let RawRow {
        source,
        id,
        course_id,
        module_id,
        category,
        term,
        definition,
        question,
        answer,
        title,
        description,
        content,
        relevance: _,
    } = row;

    let category = category.unwrap_or_else(|| source.clone());
    let lesson = || LessonFields {
        title: title.clone(),
        description: description.clone(),
        content: content.clone(),
    };

    let body = match source.parse::<SourceKind>() {
        Ok(SourceKind::Glossary) => RecordBody::Glossary { term, definition },
        Ok(SourceKind::Faq) => RecordBody::Faq { question, answer },
        Ok(SourceKind::Course) => RecordBody::Course(lesson()),
        Ok(SourceKind::Module) => RecordBody::Module(lesson()),
        Ok(SourceKind::Activity) => RecordBody::Activity(lesson()),
        Ok(SourceKind::QuizQuestion) => RecordBody::QuizQuestion {
            question,
            answer,
            title: title.clone(),
            content: content.clone(),
        },
        Err(_) => RecordBody::Unrecognized { source },
    };

    ContentRecord {
        id,
        course_id,
        module_id,
        category,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_row(source: &str) -> RawRow {
        RawRow {
            source: source.into(),
            id: "r1".into(),
            course_id: Some("c1".into()),
            module_id: Some("m1".into()),
            category: None,
            term: Some("term".into()),
            definition: Some("definition".into()),
            question: Some("question".into()),
            answer: Some("answer".into()),
            title: Some("title".into()),
            description: Some("description".into()),
            content: Some("content".into()),
            relevance: 10,
        }
    }

    fn keys(record: &ContentRecord) -> Vec<String> {
        let json = serde_json::to_value(record).expect("serialize");
        let mut keys: Vec<String> = json.as_object().expect("object").keys().cloned().collect();
        keys.sort();
        keys
    }

    #[test]
    fn glossary_never_carries_question_fields() {
        let record = normalize(full_row("glossary"));
        assert_eq!(record.source(), "glossary");
        assert_eq!(
            keys(&record),
            vec!["category", "course_id", "definition", "id", "module_id", "source", "term"]
        );
    }

    #[test]
    fn each_source_exposes_its_variant_fields() {
        let cases: [(&str, &[&str]); 6] = [
            ("glossary", &["term", "definition"]),
            ("faq", &["question", "answer"]),
            ("course", &["title", "description", "content"]),
            ("module", &["title", "description", "content"]),
            ("activity", &["title", "description", "content"]),
            ("quiz_question", &["question", "answer", "title", "content"]),
        ];
        for (source, expected) in cases {
            let record = normalize(full_row(source));
            let names: Vec<&str> = record.fields().iter().map(|(name, _)| *name).collect();
            assert_eq!(names, expected, "fields for {source}");
            assert_eq!(keys(&record).len(), 5 + expected.len());
        }
    }

    #[test]
    fn unknown_source_falls_back_to_common_fields() {
        let record = normalize(full_row("webinar"));
        assert_eq!(record.source(), "webinar");
        assert!(record.fields().is_empty());
        assert_eq!(
            keys(&record),
            vec!["category", "course_id", "id", "module_id", "source"]
        );
    }

    #[test]
    fn missing_category_defaults_to_source_tag() {
        let record = normalize(full_row("faq"));
        assert_eq!(record.category, "faq");

        let mut row = full_row("course");
        row.category = Some("AI literacy".into());
        assert_eq!(normalize(row).category, "AI literacy");
    }
}
