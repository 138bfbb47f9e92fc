use std::sync::Arc;

use anyhow::Context;
use tracing::{info, instrument, warn};

use crate::{
    db::{parse_id, StoreError, MAX_TEXT_LEN},
    error::{AppError, AppResult},
    patch::Patch,
    users::{
        password::PasswordPolicy,
        repo::UserRepo,
        repo_types::User,
    },
};

/// Account lifecycle rules: signup, signin, profile update and admin delete.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepo>,
    passwords: PasswordPolicy,
}

fn check_len(field: &str, value: &str) -> AppResult<()> {
    if value.chars().count() > MAX_TEXT_LEN {
        warn!(%field, "value too long");
        return Err(AppError::invalid(format!(
            "{field} longer than {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepo>, passwords: PasswordPolicy) -> Self {
        Self { repo, passwords }
    }

    /// Argon2 is CPU bound; keep it off the async workers.
    async fn hash_blocking(&self, plain: String) -> AppResult<String> {
        let passwords = self.passwords.clone();
        let hash = tokio::task::spawn_blocking(move || passwords.hash(&plain))
            .await
            .context("hash task panicked")??;
        Ok(hash)
    }

    async fn verify_blocking(&self, plain: String, hash: String) -> AppResult<bool> {
        let passwords = self.passwords.clone();
        let ok = tokio::task::spawn_blocking(move || passwords.verify(&plain, &hash))
            .await
            .context("verify task panicked")??;
        Ok(ok)
    }

    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, account: &str, password: &str) -> AppResult<User> {
        let account = account.trim();
        if account.is_empty() || password.is_empty() {
            warn!("empty account or password");
            return Err(AppError::invalid("account or password empty"));
        }
        check_len("account", account)?;

        if self.repo.find_by_account(account).await?.is_some() {
            warn!(%account, "account exists");
            return Err(AppError::AccountExists);
        }

        let hash = self.hash_blocking(password.to_owned()).await?;
        let user = match self.repo.create(account, &hash).await {
            Ok(u) => u,
            // lost a race against a concurrent signup for the same handle
            Err(StoreError::Duplicate) => {
                warn!(%account, "account exists (concurrent insert)");
                return Err(AppError::AccountExists);
            }
            Err(e) => return Err(e.into()),
        };

        info!(user_id = %user.id, account = %user.account, "user created");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, account: &str, password: &str) -> AppResult<User> {
        let account = account.trim();
        if account.is_empty() || password.is_empty() {
            warn!("empty account or password");
            return Err(AppError::invalid("account or password empty"));
        }

        let Some(user) = self.repo.find_by_account(account).await? else {
            warn!(%account, "account not exists");
            return Err(AppError::AccountNotFound);
        };

        if !self
            .verify_blocking(password.to_owned(), user.password_hash.clone())
            .await?
        {
            warn!(%account, user_id = %user.id, "password not match");
            return Err(AppError::PasswordMismatch);
        }

        info!(user_id = %user.id, account = %user.account, "user signed in");
        Ok(user)
    }

    pub async fn list_all_users(&self) -> AppResult<Vec<User>> {
        Ok(self.repo.list_active().await?)
    }

    #[instrument(skip(self, nickname, password))]
    pub async fn update_user(
        &self,
        id: &str,
        nickname: Patch<String>,
        password: Patch<String>,
    ) -> AppResult<User> {
        if let Patch::Set(nickname) = &nickname {
            check_len("nickname", nickname)?;
        }
        let Some(id) = parse_id(id) else {
            return Err(AppError::UserNotFound);
        };
        let Some(mut user) = self.repo.find_by_id(id).await? else {
            warn!(user_id = %id, "user not found");
            return Err(AppError::UserNotFound);
        };

        if let Patch::Set(nickname) = nickname {
            info!(user_id = %id, "set nickname");
            user.nickname = Some(nickname);
        }
        if let Patch::Set(password) = password {
            info!(user_id = %id, "set password");
            user.password_hash = self.hash_blocking(password).await?;
        }

        // deleted between the read and the write
        let updated = self.repo.save(&user).await?.ok_or(AppError::UserNotFound)?;
        info!(user_id = %updated.id, "user updated");
        Ok(updated)
    }

    /// Soft-deletes the user named by `target_account`, provided the user
    /// identified by `operator_id` is an admin.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, operator_id: &str, target_account: &str) -> AppResult<()> {
        let target_account = target_account.trim();
        if target_account.is_empty() {
            warn!("empty account");
            return Err(AppError::invalid("account empty"));
        }

        let operator = match parse_id(operator_id) {
            Some(id) => self.repo.find_by_id(id).await?,
            None => None,
        };
        let Some(operator) = operator else {
            warn!(%operator_id, "operator not found");
            return Err(AppError::UserNotFound);
        };
        if !operator.is_admin {
            warn!(operator = %operator.account, "permission denied");
            return Err(AppError::PermissionDenied);
        }

        let Some(target) = self.repo.find_by_account(target_account).await? else {
            warn!(account = %target_account, "user not found");
            return Err(AppError::UserNotFound);
        };

        self.repo.soft_delete(target.id).await?;
        info!(user_id = %target.id, operator = %operator.account, "user deleted");
        Ok(())
    }
}
