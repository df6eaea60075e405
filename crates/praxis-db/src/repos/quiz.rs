//! Quizzes, their questions and public submissions.

use chrono::Utc;
use serde::Deserialize;

use praxis_core::entities::{Lead, Quiz, QuizQuestion, QuizWithQuestions};
use praxis_core::enums::{AuditAction, EntityType, EventKind, LeadSource, QuestionKind};
use praxis_core::ids::{PREFIX_QUESTION, PREFIX_QUIZ};
use praxis_core::quiz::{process_answers, summary};

use crate::Tx;
use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, ensure_affected, get_bool, get_opt_string, parse_datetime, parse_enum,
    parse_string_list,
};
use crate::repos::event::NewEvent;
use crate::repos::lead::{NewLead, ensure_owned_in};
use crate::service::PraxisService;
use crate::updates::SetClauses;
use crate::updates::quiz::{QuestionUpdate, QuizUpdate};

const QUIZ_COLS: &str = "id, user_id, title, description, active, submissions, created_at, updated_at";
const QUESTION_COLS: &str = "id, quiz_id, prompt, kind, options, required, position";

const fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuiz {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuestion {
    pub prompt: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

/// Public quiz submission: contact details plus raw answers keyed by
/// question id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuizSubmission {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub answers: serde_json::Map<String, serde_json::Value>,
}

fn row_to_quiz(row: &libsql::Row) -> Result<Quiz, DatabaseError> {
    Ok(Quiz {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        title: row.get::<String>(2)?,
        description: get_opt_string(row, 3)?,
        active: get_bool(row, 4)?,
        submissions: row.get::<i64>(5)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
        updated_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

fn row_to_question(row: &libsql::Row) -> Result<QuizQuestion, DatabaseError> {
    Ok(QuizQuestion {
        id: row.get::<String>(0)?,
        quiz_id: row.get::<String>(1)?,
        prompt: row.get::<String>(2)?,
        kind: parse_enum(&row.get::<String>(3)?)?,
        options: parse_string_list(&row.get::<String>(4)?)?,
        required: get_bool(row, 5)?,
        position: row.get::<i64>(6)?,
    })
}

fn check_options(kind: QuestionKind, options: &[String]) -> Result<(), DatabaseError> {
    if kind.requires_options() && options.iter().all(|o| o.trim().is_empty()) {
        return Err(DatabaseError::Validation(format!(
            "{kind} questions need at least one option"
        )));
    }
    Ok(())
}

/// Quiz id of a question, provided the quiz belongs to `user_id`.
async fn question_quiz_in(tx: &Tx<'_>, id: &str, user_id: &str) -> Result<String, DatabaseError> {
    let mut rows = tx
        .query(
            "SELECT q.quiz_id FROM quiz_questions q JOIN quizzes z ON z.id = q.quiz_id
             WHERE q.id = ?1 AND z.user_id = ?2",
            [id, user_id],
        )
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    Ok(row.get::<String>(0)?)
}

impl PraxisService {
    pub async fn create_quiz(&self, user_id: &str, new: &NewQuiz) -> Result<Quiz, DatabaseError> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(DatabaseError::Validation("quiz title is required".into()));
        }

        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_QUIZ).await?;
        self.db()
            .execute(
                &format!("INSERT INTO quizzes ({QUIZ_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)"),
                libsql::params![
                    id.as_str(),
                    user_id,
                    title,
                    new.description.as_deref(),
                    i64::from(new.active),
                    now.to_rfc3339()
                ],
            )
            .await?;
        self.audit(user_id, EntityType::Quiz, &id, AuditAction::Created, None)
            .await?;

        Ok(Quiz {
            id,
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: new.description.clone(),
            active: new.active,
            submissions: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_quiz(&self, user_id: &str, id: &str) -> Result<Quiz, DatabaseError> {
        let sql = format!("SELECT {QUIZ_COLS} FROM quizzes WHERE id = ?1 AND user_id = ?2");
        let mut rows = self.db().query(&sql, [id, user_id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_quiz(&row)
    }

    pub async fn list_quizzes(&self, user_id: &str) -> Result<Vec<Quiz>, DatabaseError> {
        let sql = format!(
            "SELECT {QUIZ_COLS} FROM quizzes WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
        );
        let rows = self.db().query(&sql, [user_id]).await?;
        collect_rows(rows, row_to_quiz).await
    }

    pub async fn update_quiz(
        &self,
        user_id: &str,
        id: &str,
        update: QuizUpdate,
    ) -> Result<Quiz, DatabaseError> {
        let mut sets = SetClauses::new();
        if let Some(ref title) = update.title {
            if title.trim().is_empty() {
                return Err(DatabaseError::Validation("quiz title is required".into()));
            }
            sets.set("title", title.trim());
        }
        if let Some(ref description) = update.description {
            sets.set_opt("description", description.as_deref());
        }
        if let Some(active) = update.active {
            sets.set_bool("active", active);
        }

        if sets.is_empty() {
            return self.get_quiz(user_id, id).await;
        }
        sets.set("updated_at", Utc::now().to_rfc3339());

        let (sql, params) = sets.into_sql("quizzes", id, Some(user_id));
        ensure_affected(self.db().execute(&sql, libsql::params_from_iter(params)).await?)?;
        self.audit(
            user_id,
            EntityType::Quiz,
            id,
            AuditAction::Updated,
            Some(serde_json::to_value(&update)?),
        )
        .await?;
        self.get_quiz(user_id, id).await
    }

    pub async fn delete_quiz(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        ensure_affected(
            self.db()
                .execute("DELETE FROM quizzes WHERE id = ?1 AND user_id = ?2", [id, user_id])
                .await?,
        )?;
        self.audit(user_id, EntityType::Quiz, id, AuditAction::Deleted, None)
            .await
    }

    pub async fn get_quiz_with_questions(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<QuizWithQuestions, DatabaseError> {
        let quiz = self.get_quiz(user_id, id).await?;
        let questions = self.list_questions_of(id).await?;
        Ok(QuizWithQuestions { quiz, questions })
    }

    /// Public lookup; inactive quizzes are reported as `NoResult`.
    pub async fn get_public_quiz(&self, id: &str) -> Result<QuizWithQuestions, DatabaseError> {
        let sql = format!("SELECT {QUIZ_COLS} FROM quizzes WHERE id = ?1 AND active = 1");
        let mut rows = self.db().query(&sql, [id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let quiz = row_to_quiz(&row)?;
        let questions = self.list_questions_of(id).await?;
        Ok(QuizWithQuestions { quiz, questions })
    }

    pub async fn add_question(
        &self,
        user_id: &str,
        quiz_id: &str,
        new: &NewQuestion,
    ) -> Result<QuizQuestion, DatabaseError> {
        let prompt = new.prompt.trim();
        if prompt.is_empty() {
            return Err(DatabaseError::Validation("question prompt is required".into()));
        }
        check_options(new.kind, &new.options)?;

        let tx = self.db().transaction().await?;
        let result: Result<QuizQuestion, DatabaseError> = async {
            ensure_owned_in(&tx, "quizzes", quiz_id, user_id).await?;
            let mut rows = tx
                .query(
                    "SELECT COALESCE(MAX(position) + 1, 0) FROM quiz_questions WHERE quiz_id = ?1",
                    [quiz_id],
                )
                .await?;
            let position = match rows.next().await? {
                Some(row) => row.get::<i64>(0)?,
                None => 0,
            };

            let id = self.db().generate_id(PREFIX_QUESTION).await?;
            tx.execute(
                &format!("INSERT INTO quiz_questions ({QUESTION_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                libsql::params![
                    id.as_str(),
                    quiz_id,
                    prompt,
                    new.kind.as_str(),
                    serde_json::to_string(&new.options)?,
                    i64::from(new.required),
                    position
                ],
            )
            .await?;
            self.audit_in(&tx, user_id, EntityType::QuizQuestion, &id, AuditAction::Created, None)
                .await?;

            Ok(QuizQuestion {
                id,
                quiz_id: quiz_id.to_string(),
                prompt: prompt.to_string(),
                kind: new.kind,
                options: new.options.clone(),
                required: new.required,
                position,
            })
        }
        .await;
        tx.finish(result).await
    }

    /// The effective kind/options pair is re-validated after merging.
    pub async fn update_question(
        &self,
        user_id: &str,
        id: &str,
        update: QuestionUpdate,
    ) -> Result<QuizQuestion, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<QuizQuestion, DatabaseError> = async {
            question_quiz_in(&tx, id, user_id).await?;
            let sql = format!("SELECT {QUESTION_COLS} FROM quiz_questions WHERE id = ?1");
            let mut rows = tx.query(&sql, [id]).await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            let current = row_to_question(&row)?;

            let kind = update.kind.unwrap_or(current.kind);
            let options = update.options.clone().unwrap_or_else(|| current.options.clone());
            check_options(kind, &options)?;

            let mut sets = SetClauses::new();
            if let Some(ref prompt) = update.prompt {
                if prompt.trim().is_empty() {
                    return Err(DatabaseError::Validation("question prompt is required".into()));
                }
                sets.set("prompt", prompt.trim());
            }
            if let Some(kind) = update.kind {
                sets.set("kind", kind.as_str());
            }
            if let Some(ref options) = update.options {
                sets.set("options", serde_json::to_string(options)?);
            }
            if let Some(required) = update.required {
                sets.set_bool("required", required);
            }
            if sets.is_empty() {
                return Ok(current);
            }

            let (sql, params) = sets.into_sql("quiz_questions", id, None);
            tx.execute(&sql, libsql::params_from_iter(params)).await?;
            self.audit_in(
                &tx,
                user_id,
                EntityType::QuizQuestion,
                id,
                AuditAction::Updated,
                Some(serde_json::to_value(&update)?),
            )
            .await?;

            let sql = format!("SELECT {QUESTION_COLS} FROM quiz_questions WHERE id = ?1");
            let mut rows = tx.query(&sql, [id]).await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            row_to_question(&row)
        }
        .await;
        tx.finish(result).await
    }

    pub async fn delete_question(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<(), DatabaseError> = async {
            let quiz_id = question_quiz_in(&tx, id, user_id).await?;
            let mut rows = tx
                .query("SELECT position FROM quiz_questions WHERE id = ?1", [id])
                .await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            let position = row.get::<i64>(0)?;

            tx.execute("DELETE FROM quiz_questions WHERE id = ?1", [id]).await?;
            tx.execute(
                "UPDATE quiz_questions SET position = position - 1 WHERE quiz_id = ?1 AND position > ?2",
                libsql::params![quiz_id.as_str(), position],
            )
            .await?;
            self.audit_in(&tx, user_id, EntityType::QuizQuestion, id, AuditAction::Deleted, None)
                .await
        }
        .await;
        tx.finish(result).await
    }

    /// Rewrite question positions to follow `ids` (every question once).
    pub async fn reorder_questions(
        &self,
        user_id: &str,
        quiz_id: &str,
        ids: &[String],
    ) -> Result<Vec<QuizQuestion>, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<(), DatabaseError> = async {
            ensure_owned_in(&tx, "quizzes", quiz_id, user_id).await?;
            let mut rows = tx
                .query("SELECT id FROM quiz_questions WHERE quiz_id = ?1", [quiz_id])
                .await?;
            let mut current = Vec::new();
            while let Some(row) = rows.next().await? {
                current.push(row.get::<String>(0)?);
            }
            let mut requested = ids.to_vec();
            requested.sort();
            requested.dedup();
            current.sort();
            if requested.len() != ids.len() || requested != current {
                return Err(DatabaseError::Validation(
                    "question order must list every question exactly once".into(),
                ));
            }

            for (position, id) in (0_i64..).zip(ids) {
                tx.execute(
                    "UPDATE quiz_questions SET position = ?1 WHERE id = ?2",
                    libsql::params![position, id.as_str()],
                )
                .await?;
            }
            self.audit_in(
                &tx,
                user_id,
                EntityType::Quiz,
                quiz_id,
                AuditAction::Reordered,
                Some(serde_json::json!({ "questions": ids })),
            )
            .await
        }
        .await;
        tx.finish(result).await?;
        self.list_questions_of(quiz_id).await
    }

    /// Process a public submission into a `quiz` lead.
    ///
    /// Answers are coerced per question kind; the processed answers and
    /// their summary go to `metadata`, the summary also to `notes`.
    pub async fn submit_quiz(
        &self,
        quiz_id: &str,
        submission: &QuizSubmission,
    ) -> Result<Lead, DatabaseError> {
        let public = self.get_public_quiz(quiz_id).await?;
        let answers = process_answers(&public.questions, &submission.answers)?;
        let text = summary(&answers);

        let new = NewLead {
            name: submission.name.clone(),
            email: submission.email.clone(),
            phone: submission.phone.clone(),
            notes: (!text.is_empty()).then(|| text.clone()),
            source: LeadSource::Quiz,
            metadata: Some(serde_json::json!({
                "quiz_id": quiz_id,
                "answers": answers,
                "summary": text,
            })),
            ..Default::default()
        };
        let user_id = public.quiz.user_id.as_str();

        let tx = self.db().transaction().await?;
        let result: Result<Lead, DatabaseError> = async {
            let lead = self.insert_lead_in(&tx, user_id, &new).await?;
            tx.execute(
                "UPDATE quizzes SET submissions = submissions + 1 WHERE id = ?1",
                [quiz_id],
            )
            .await?;
            self.insert_event_in(
                &tx,
                &NewEvent {
                    user_id: user_id.to_string(),
                    kind: EventKind::QuizCompleted,
                    lead_id: Some(lead.id.clone()),
                    metadata: Some(serde_json::json!({ "quiz_id": quiz_id })),
                    ..Default::default()
                },
            )
            .await?;
            Ok(lead)
        }
        .await;
        let lead = tx.finish(result).await?;
        tracing::debug!(quiz_id, lead_id = %lead.id, "quiz submitted");
        Ok(lead)
    }

    async fn list_questions_of(&self, quiz_id: &str) -> Result<Vec<QuizQuestion>, DatabaseError> {
        let sql = format!(
            "SELECT {QUESTION_COLS} FROM quiz_questions WHERE quiz_id = ?1 ORDER BY position"
        );
        let rows = self.db().query(&sql, [quiz_id]).await?;
        collect_rows(rows, row_to_question).await
    }
}
