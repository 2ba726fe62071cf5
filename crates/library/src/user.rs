//! User profiles.

use std::sync::Arc;

use chrono::Utc;
use soundshelf_core::error::CoreError;
use soundshelf_core::roles::UserRole;
use soundshelf_db::models::user::{CreateUser, User};
use soundshelf_db::repositories::UserRepo;
use soundshelf_db::store::ItemStore;

use crate::validate_input;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn ItemStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Create a profile with the default role.
    ///
    /// Email uniqueness is checked through the email index before the
    /// guarded create, so two concurrent sign-ups with one address can both
    /// pass the check.
    pub async fn create_user(&self, input: CreateUser) -> Result<User, CoreError> {
        validate_input(&input)?;
        let email = input.email.trim().to_lowercase();
        if UserRepo::find_by_email(self.store.as_ref(), &email)
            .await?
            .is_some()
        {
            return Err(CoreError::already_exists("user", &email));
        }

        let now = Utc::now();
        let user = User {
            id: input.id,
            email,
            display_name: input.display_name,
            role: UserRole::default(),
            enabled: true,
            avatar_key: None,
            created_at: now,
            updated_at: now,
        };
        UserRepo::create(self.store.as_ref(), &user).await?;
        tracing::info!(user_id = %user.id, role = user.role.name(), "User created");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, CoreError> {
        UserRepo::get(self.store.as_ref(), user_id).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, CoreError> {
        UserRepo::find_by_email(self.store.as_ref(), &email.trim().to_lowercase()).await
    }

    pub async fn update_display_name(
        &self,
        user_id: &str,
        display_name: &str,
    ) -> Result<User, CoreError> {
        let display_name = display_name.trim();
        if display_name.is_empty() || display_name.chars().count() > 100 {
            return Err(CoreError::Validation(
                "Display name must be 1-100 characters".into(),
            ));
        }
        let mut user = UserRepo::get(self.store.as_ref(), user_id).await?;
        user.display_name = display_name.to_string();
        user.updated_at = Utc::now();
        UserRepo::update(self.store.as_ref(), &user).await?;
        Ok(user)
    }
}
