use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    clock::Clock,
    config::{
        auth::JwtService,
        config::SuperAdminCredentials,
        crypto::CryptoService,
    },
    error::{AppError, AppResult},
    models::admin::{Admin, AdminChanges, AdminRow, NewAdmin, UpdateAdmin},
    store::AdminStore,
};

pub struct AdminService {
    pub store: Arc<dyn AdminStore>,
    pub crypto: CryptoService,
    pub clock: Arc<dyn Clock>,
}

impl AdminService {
    pub fn new(store: Arc<dyn AdminStore>, crypto: CryptoService, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            crypto,
            clock,
        }
    }

    fn hash(&self, password: &str) -> AppResult<String> {
        self.crypto
            .hash_password(password)
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    /// Verifies credentials and returns the admin with a signed token.
    #[instrument(skip(self, password, jwt))]
    pub async fn login(&self, email: &str, password: &str, jwt: &JwtService) -> AppResult<(Admin, String)> {
        let email = email.trim().to_lowercase();
        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

        let admin = self
            .store
            .find_admin_by_email(&email)
            .await?
            .ok_or_else(invalid)?;

        let matches = self
            .crypto
            .verify_password(password, &admin.password_hash)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if !matches {
            warn!(admin_id = %admin.id, "failed admin login");
            return Err(invalid());
        }

        let token = jwt.issue(&admin)?;
        info!(admin_id = %admin.id, "admin logged in");
        Ok((admin, token))
    }

    #[instrument(skip(self, new_admin), fields(username = %new_admin.username))]
    pub async fn create(&self, new_admin: NewAdmin) -> AppResult<Admin> {
        new_admin.validate()?;
        let username = new_admin.username.trim().to_string();
        let email = new_admin.email.trim().to_lowercase();

        if self
            .store
            .find_admin_by_identity(&username, &email, None)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Admin already exists with this username or email".to_string(),
            ));
        }

        let admin = self
            .store
            .insert_admin(AdminRow {
                username,
                email,
                password_hash: self.hash(&new_admin.password)?,
                is_super_admin: false,
                created_at: self.clock.now(),
            })
            .await?;

        info!(admin_id = %admin.id, "admin created");
        Ok(admin)
    }

    pub async fn list(&self, search: Option<&str>) -> AppResult<Vec<Admin>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        Ok(self.store.list_admins(search).await?)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Admin> {
        self.store.get_admin(id).await?.ok_or_else(not_found)
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, id: Uuid, update: UpdateAdmin) -> AppResult<Admin> {
        update.validate()?;
        let current = self.get(id).await?;

        let username = update.username.map(|u| u.trim().to_string());
        let email = update.email.map(|e| e.trim().to_lowercase());
        if self
            .store
            .find_admin_by_identity(
                username.as_deref().unwrap_or(&current.username),
                email.as_deref().unwrap_or(&current.email),
                Some(id),
            )
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Admin already exists with this username or email".to_string(),
            ));
        }

        let password_hash = match update.password {
            Some(password) => Some(self.hash(&password)?),
            None => None,
        };

        let admin = self
            .store
            .update_admin(
                id,
                AdminChanges {
                    username,
                    email,
                    password_hash,
                },
                self.clock.now(),
            )
            .await?
            .ok_or_else(not_found)?;

        info!(admin_id = %id, "admin updated");
        Ok(admin)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let admin = self.get(id).await?;
        if admin.is_super_admin {
            return Err(AppError::Forbidden(
                "The super admin cannot be deleted".to_string(),
            ));
        }
        self.store.delete_admin(id).await?;
        info!(admin_id = %id, "admin deleted");
        Ok(())
    }

    /// Creates the super admin, or resets it to the configured credentials.
    pub async fn sync_super_admin(&self, creds: &SuperAdminCredentials) -> AppResult<Admin> {
        let row = AdminRow {
            username: creds.username.trim().to_string(),
            email: creds.email.trim().to_lowercase(),
            password_hash: self.hash(&creds.password)?,
            is_super_admin: true,
            created_at: self.clock.now(),
        };

        let admin = match self.store.find_super_admin().await? {
            Some(existing) => self.store.update_super_admin(existing.id, row).await?,
            None => self.store.insert_admin(row).await?,
        };

        info!(admin_id = %admin.id, "super admin synced");
        Ok(admin)
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Admin not found".to_string())
}
