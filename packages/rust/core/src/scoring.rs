//! Questionnaire scoring.
//!
//! Pure and synchronous: the caller loads questions and responses, this
//! module turns them into a [`ScoreResult`].

use std::collections::{BTreeMap, HashMap};

use aitutor_shared::{
    Block, Classification, Question, Response, Result, ScoreResult, ScoringMap,
    TutorError, UnknownQuestionPolicy, normalize_letter,
};
use tracing::{debug, warn};

/// Round to two decimals, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score of one answer against its question's scoring map.
///
/// Letters are compared after trimming and upper-casing. A letter missing
/// from the map, or a malformed map, scores 0.
pub fn question_score(question: &Question, answer: &str) -> f64 {
    match &question.scoring_map {
        ScoringMap::Table(table) => table
            .get(&normalize_letter(answer))
            .copied()
            .unwrap_or(0.0),
        ScoringMap::Malformed { reason } => {
            warn!(
                question_id = %question.id,
                code = %question.code,
                %reason,
                "malformed scoring map, answer scores 0"
            );
            0.0
        }
    }
}

fn mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Score a set of responses against the loaded questions.
///
/// Block scores are the mean of their per-question scores (0 for a block
/// with no responses). The total is the plain mean of the two block scores,
/// regardless of how many responses each block has. Classification uses the
/// rounded total.
///
/// Several responses to one question collapse to the last one in slice
/// order, so a question is never counted twice.
///
/// Responses whose question is not loaded are skipped with a warning, or
/// fail with [`TutorError::UnknownQuestion`] under
/// [`UnknownQuestionPolicy::Reject`].
pub fn score_responses(
    questions: &[Question],
    responses: &[Response],
    policy: UnknownQuestionPolicy,
) -> Result<ScoreResult> {
    let by_id: HashMap<&str, &Question> =
        questions.iter().map(|q| (q.id.as_str(), q)).collect();

    let mut latest: BTreeMap<&str, &Response> = BTreeMap::new();
    for response in responses {
        latest.insert(response.question_id.as_str(), response);
    }
    if latest.len() < responses.len() {
        debug!(
            responses = responses.len(),
            distinct = latest.len(),
            "duplicate responses collapsed"
        );
    }

    let mut adoption = Vec::new();
    let mut knowledge = Vec::new();

    for response in latest.into_values() {
        let Some(question) = by_id.get(response.question_id.as_str()) else {
            match policy {
                UnknownQuestionPolicy::Skip => {
                    warn!(question_id = %response.question_id, "response for unknown question skipped");
                    continue;
                }
                UnknownQuestionPolicy::Reject => {
                    return Err(TutorError::UnknownQuestion(response.question_id.clone()));
                }
            }
        };

        let score = question_score(question, &response.answer);
        match question.block {
            Block::Adoption => adoption.push(score),
            Block::Knowledge => knowledge.push(score),
        }
    }

    let adoption_score = mean(&adoption);
    let knowledge_score = mean(&knowledge);
    let total_score = round2((adoption_score + knowledge_score) / 2.0);

    debug!(
        adoption = adoption.len(),
        knowledge = knowledge.len(),
        total_score,
        "responses scored"
    );

    Ok(ScoreResult {
        adoption_score: round2(adoption_score),
        knowledge_score: round2(knowledge_score),
        total_score,
        classification: Classification::from_total(total_score),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use aitutor_shared::QuestionType;
    use chrono::Utc;

    use super::*;

    /// Question whose options A..E score 1..5.
    pub(crate) fn question(id: &str, block: Block) -> Question {
        Question {
            id: id.into(),
            code: id.to_uppercase(),
            section: "General".into(),
            block,
            area_id: None,
            role_id: "instructor".into(),
            text: format!("Question {id}"),
            question_type: QuestionType::SingleChoice,
            options: vec!["One".into(), "Two".into(), "Three".into(), "Four".into(), "Five".into()],
            scoring_map: ScoringMap::from_pairs([
                ("A", 1.0),
                ("B", 2.0),
                ("C", 3.0),
                ("D", 4.0),
                ("E", 5.0),
            ]),
        }
    }

    pub(crate) fn response(question_id: &str, answer: &str) -> Response {
        Response {
            question_id: question_id.into(),
            answer: answer.into(),
            timestamp: Utc::now(),
        }
    }

    fn with_map(id: &str, block: Block, map: ScoringMap) -> Question {
        Question {
            scoring_map: map,
            ..question(id, block)
        }
    }

    #[test]
    fn round2_is_half_away_from_zero() {
        assert_eq!(round2(1.0 / 3.0 * 100.0), 33.33);
        assert_eq!(round2(2.0 / 3.0 * 100.0), 66.67);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
    }

    #[test]
    fn mixed_blocks_average_per_block() {
        let questions = vec![
            question("a1", Block::Adoption),
            question("a2", Block::Adoption),
            question("a3", Block::Adoption),
            question("a4", Block::Adoption),
            question("k1", Block::Knowledge),
            question("k2", Block::Knowledge),
        ];
        let responses = vec![
            response("a1", "A"),
            response("a2", "B"),
            response("a3", "C"),
            response("a4", "D"),
            response("k1", "E"),
            response("k2", "e"),
        ];

        let result = score_responses(&questions, &responses, UnknownQuestionPolicy::Skip)
            .expect("score");
        assert_eq!(result.adoption_score, 2.5);
        assert_eq!(result.knowledge_score, 5.0);
        assert_eq!(result.total_score, 3.75);
        assert_eq!(result.classification, Classification::Basic);
    }

    #[test]
    fn no_responses_scores_zero() {
        let questions = vec![question("a1", Block::Adoption)];
        let result =
            score_responses(&questions, &[], UnknownQuestionPolicy::Skip).expect("score");
        assert_eq!(result.adoption_score, 0.0);
        assert_eq!(result.knowledge_score, 0.0);
        assert_eq!(result.total_score, 0.0);
        assert_eq!(result.classification, Classification::Basic);
    }

    #[test]
    fn empty_block_counts_as_zero_in_total() {
        let questions = vec![with_map(
            "a1",
            Block::Adoption,
            ScoringMap::from_pairs([("A", 100.0)]),
        )];
        let result = score_responses(
            &questions,
            &[response("a1", "A")],
            UnknownQuestionPolicy::Skip,
        )
        .expect("score");
        assert_eq!(result.adoption_score, 100.0);
        assert_eq!(result.knowledge_score, 0.0);
        assert_eq!(result.total_score, 50.0);
        assert_eq!(result.classification, Classification::Intermediate);
    }

    #[test]
    fn total_ignores_response_counts() {
        let full = ScoringMap::from_pairs([("A", 100.0), ("B", 0.0)]);
        let mut questions = vec![with_map("a1", Block::Adoption, full.clone())];
        let mut responses = vec![response("a1", "A")];
        for i in 0..50 {
            let id = format!("k{i}");
            questions.push(with_map(&id, Block::Knowledge, full.clone()));
            responses.push(response(&id, "B"));
        }

        let result = score_responses(&questions, &responses, UnknownQuestionPolicy::Skip)
            .expect("score");
        assert_eq!(result.total_score, 50.0);
    }

    #[test]
    fn all_zero_maps_score_zero() {
        let zero = ScoringMap::from_pairs([("A", 0.0), ("B", 0.0)]);
        let questions = vec![
            with_map("a1", Block::Adoption, zero.clone()),
            with_map("k1", Block::Knowledge, zero),
        ];
        let responses = vec![response("a1", "A"), response("k1", "B")];
        let result = score_responses(&questions, &responses, UnknownQuestionPolicy::Skip)
            .expect("score");
        assert_eq!(result.total_score, 0.0);
        assert_eq!(result.classification, Classification::Basic);
    }

    #[test]
    fn letter_missing_from_map_scores_zero() {
        let questions = vec![question("a1", Block::Adoption), question("a2", Block::Adoption)];
        let responses = vec![response("a1", "Z"), response("a2", "D")];
        let result = score_responses(&questions, &responses, UnknownQuestionPolicy::Skip)
            .expect("score");
        assert_eq!(result.adoption_score, 2.0);
    }

    #[test]
    fn malformed_map_contributes_zero() {
        let questions = vec![
            with_map(
                "a1",
                Block::Adoption,
                ScoringMap::Malformed {
                    reason: "expected object".into(),
                },
            ),
            question("a2", Block::Adoption),
        ];
        let responses = vec![response("a1", "A"), response("a2", "E")];
        let result = score_responses(&questions, &responses, UnknownQuestionPolicy::Skip)
            .expect("score");
        assert_eq!(result.adoption_score, 2.5);
    }

    #[test]
    fn unknown_question_is_skipped_by_default() {
        let questions = vec![question("a1", Block::Adoption)];
        let responses = vec![response("a1", "C"), response("ghost", "E")];
        let result = score_responses(&questions, &responses, UnknownQuestionPolicy::Skip)
            .expect("score");
        assert_eq!(result.adoption_score, 3.0);
    }

    #[test]
    fn unknown_question_rejected_when_strict() {
        let questions = vec![question("a1", Block::Adoption)];
        let responses = vec![response("a1", "C"), response("ghost", "E")];
        let err = score_responses(&questions, &responses, UnknownQuestionPolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, TutorError::UnknownQuestion(id) if id == "ghost"));
    }

    #[test]
    fn duplicate_question_counts_last_answer_once() {
        let questions = vec![question("a1", Block::Adoption), question("a2", Block::Adoption)];
        let responses = vec![
            response("a1", "A"),
            response("a2", "C"),
            response("a1", "E"),
            response("a1", "E"),
        ];
        let result = score_responses(&questions, &responses, UnknownQuestionPolicy::Skip)
            .expect("score");
        // (5 + 3) / 2, not (1 + 3 + 5 + 5) / 4.
        assert_eq!(result.adoption_score, 4.0);
        assert_eq!(result.total_score, 2.0);
    }

    #[test]
    fn rounding_is_applied_to_block_scores() {
        let map = ScoringMap::from_pairs([("A", 100.0), ("B", 0.0)]);
        let questions = vec![
            with_map("a1", Block::Adoption, map.clone()),
            with_map("a2", Block::Adoption, map.clone()),
            with_map("a3", Block::Adoption, map.clone()),
            with_map("k1", Block::Knowledge, map.clone()),
            with_map("k2", Block::Knowledge, map.clone()),
            with_map("k3", Block::Knowledge, map),
        ];
        let responses = vec![
            response("a1", "A"),
            response("a2", "B"),
            response("a3", "B"),
            response("k1", "A"),
            response("k2", "A"),
            response("k3", "B"),
        ];
        let result = score_responses(&questions, &responses, UnknownQuestionPolicy::Skip)
            .expect("score");
        assert_eq!(result.adoption_score, 33.33);
        assert_eq!(result.knowledge_score, 66.67);
        assert_eq!(result.total_score, 50.0);
    }

    #[test]
    fn classification_uses_rounded_total() {
        // Block means 79.992 and 0.0 give a total of 39.996, which rounds to 40.
        let questions = vec![with_map(
            "a1",
            Block::Adoption,
            ScoringMap::from_pairs([("A", 79.992)]),
        )];
        let result = score_responses(
            &questions,
            &[response("a1", "A")],
            UnknownQuestionPolicy::Skip,
        )
        .expect("score");
        assert_eq!(result.total_score, 40.0);
        assert_eq!(result.classification, Classification::Intermediate);
    }
}
