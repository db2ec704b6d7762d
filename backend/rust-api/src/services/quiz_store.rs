use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::FindOptions, Collection, Database};

use crate::metrics::track_store_operation;
use crate::models::{AttemptRecord, Question};

pub const QUESTIONS_COLLECTION: &str = "hoisting_questions";
pub const ATTEMPTS_COLLECTION: &str = "user_progress";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the question pool.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Every question, ordered by id ascending.
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError>;
}

/// Append-only log of submissions.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn record_attempt(&self, attempt: &AttemptRecord) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct MongoQuizStore {
    mongo: Database,
}

impl MongoQuizStore {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = mongodb::Client::with_uri_str(uri).await?;
        tracing::info!("MongoDB client created for database {}", database);
        Ok(Self::new(client.database(database)))
    }

    async fn find_all_questions(&self) -> Result<Vec<Question>, StoreError> {
        let collection: Collection<Question> = self.mongo.collection(QUESTIONS_COLLECTION);
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();

        let cursor = collection.find(doc! {}).with_options(options).await?;
        let questions: Vec<Question> = cursor.try_collect().await?;
        Ok(questions)
    }
}

#[async_trait]
impl QuestionStore for MongoQuizStore {
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        let questions =
            track_store_operation("find", QUESTIONS_COLLECTION, self.find_all_questions()).await?;
        tracing::debug!("Fetched {} questions", questions.len());
        Ok(questions)
    }
}

#[async_trait]
impl AttemptStore for MongoQuizStore {
    async fn record_attempt(&self, attempt: &AttemptRecord) -> Result<(), StoreError> {
        let collection: Collection<AttemptRecord> = self.mongo.collection(ATTEMPTS_COLLECTION);

        track_store_operation("insert", ATTEMPTS_COLLECTION, async {
            collection.insert_one(attempt).await.map(|_| ())
        })
        .await?;

        tracing::debug!(
            "Attempt saved: user={}, question={}, correct={}",
            attempt.user_id,
            attempt.question_id,
            attempt.is_correct
        );
        Ok(())
    }
}
