//! Wallet Directory

use async_trait::async_trait;
use mockall::automock;
use sqlx::query_scalar;

use crate::{
    database::{Db, StoreError},
    domain::identities::models::{UserUuid, WalletAddress},
};

const GET_WALLET_BY_EMAIL_SQL: &str = include_str!("sql/get_wallet_by_email.sql");
const USER_EXISTS_SQL: &str = include_str!("sql/user_exists.sql");

/// Resolves an email to the ledger wallet its owner has linked.
#[automock]
#[async_trait]
pub trait WalletDirectory: Send + Sync {
    /// `None` when the user is unknown or has not linked a wallet.
    async fn wallet_for_email(&self, email: &str) -> Result<Option<WalletAddress>, StoreError>;

    /// Whether `user` is a known account.
    async fn user_exists(&self, user: UserUuid) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgWalletDirectory {
    db: Db,
}

impl PgWalletDirectory {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WalletDirectory for PgWalletDirectory {
    async fn wallet_for_email(&self, email: &str) -> Result<Option<WalletAddress>, StoreError> {
        let wallet: Option<Option<String>> = query_scalar(GET_WALLET_BY_EMAIL_SQL)
            .bind(email)
            .fetch_optional(self.db.pool())
            .await?;

        wallet
            .flatten()
            .filter(|value| !value.trim().is_empty())
            .map(|value| {
                value
                    .parse::<WalletAddress>()
                    .map_err(|error| StoreError::Corrupt(error.to_string()))
            })
            .transpose()
    }

    async fn user_exists(&self, user: UserUuid) -> Result<bool, StoreError> {
        query_scalar(USER_EXISTS_SQL)
            .bind(user.into_uuid())
            .fetch_one(self.db.pool())
            .await
            .map_err(StoreError::from)
    }
}
