//! Quizzes Repository

use async_trait::async_trait;
use mockall::automock;
use sqlx::{FromRow, Postgres, Row, postgres::PgRow, query_as};

use crate::{
    database::{Db, StoreError},
    domain::quizzes::models::{Quiz, QuizUuid},
};

const GET_QUIZ_SQL: &str = include_str!("sql/get_quiz.sql");

#[automock]
#[async_trait]
pub trait QuizzesRepository: Send + Sync {
    async fn get_quiz(&self, quiz: QuizUuid) -> Result<Quiz, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgQuizzesRepository {
    db: Db,
}

impl PgQuizzesRepository {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QuizzesRepository for PgQuizzesRepository {
    async fn get_quiz(&self, quiz: QuizUuid) -> Result<Quiz, StoreError> {
        query_as::<Postgres, Quiz>(GET_QUIZ_SQL)
            .bind(quiz.into_uuid())
            .fetch_one(self.db.pool())
            .await
            .map_err(StoreError::from)
    }
}

impl<'r> FromRow<'r, PgRow> for Quiz {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let total: i32 = row.try_get("total_questions")?;
        let passing: i16 = row.try_get("passing_percentage")?;

        Ok(Self {
            uuid: QuizUuid::from_uuid(row.try_get("uuid")?),
            topic: row.try_get("topic")?,
            department: row.try_get("department")?,
            total_questions: u32::try_from(total).map_err(|e| sqlx::Error::ColumnDecode {
                index: "total_questions".to_string(),
                source: Box::new(e),
            })?,
            passing_percentage: u8::try_from(passing).map_err(|e| sqlx::Error::ColumnDecode {
                index: "passing_percentage".to_string(),
                source: Box::new(e),
            })?,
            active: row.try_get("active")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::test::TestDb;

    use super::*;

    #[tokio::test]
    async fn quizzes_load_with_their_threshold() -> TestResult {
        let test_db = TestDb::new().await;
        let quizzes = PgQuizzesRepository::new(test_db.db());
        let uuid = QuizUuid::new();

        sqlx::query(
            "INSERT INTO quizzes (uuid, topic, department, total_questions, passing_percentage, active) \
             VALUES ($1, 'Rust', 'CSE', 10, 70, FALSE)",
        )
        .bind(uuid.into_uuid())
        .execute(&test_db.pool)
        .await?;

        let quiz = quizzes.get_quiz(uuid).await?;

        assert_eq!(
            quiz,
            Quiz {
                uuid,
                topic: "Rust".to_string(),
                department: "CSE".to_string(),
                total_questions: 10,
                passing_percentage: 70,
                active: false,
            }
        );
        assert!(matches!(
            quizzes.get_quiz(QuizUuid::new()).await,
            Err(StoreError::NotFound)
        ));

        Ok(())
    }
}
