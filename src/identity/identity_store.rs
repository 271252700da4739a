use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{Settings, MIN_PASSWORD_LENGTH};
use crate::models::{normalize_email, IdentityError, Role, User};
use crate::storage::{load_collection, load_value, save_collection, save_value, Storage, CURRENT_USER_KEY, USERS_KEY};
use crate::types::UserId;

const DEMO_USERS: [(&str, &str, &str, Role); 2] = [
    ("Test User", "test@bank.com", "123456", Role::User),
    ("Admin User", "admin@bank.com", "admin123", Role::Admin)
];

/// Users, credentials and the current session.
///
/// Every operation re-reads the whole `users` collection, changes one record and
/// writes the collection back. Writers are serialised by an internal lock.
pub struct IdentityStore<S: Storage> {
    storage: Arc<S>,
    settings: Settings,
    session: RwLock<Option<User>>,
    write_lock: Mutex<()>
}

impl<S: Storage> IdentityStore<S> {
    /// Opens the store, seeding the demo users into an empty key space and
    /// restoring a remembered session.
    pub fn new(storage: Arc<S>, settings: Settings) -> Result<Self, IdentityError> {
        if settings.seed_demo_users && storage.get_item(USERS_KEY)?.is_none() {
            let mut users = Vec::with_capacity(DEMO_USERS.len());

            for (name, email, password, role) in DEMO_USERS {
                users.push(User::new(name, email, bcrypt::hash(password, settings.password_cost)?, role));
            }

            save_collection(&*storage, USERS_KEY, &users)?;
            info!("Seeded {} demo users", users.len());
        }

        let session = Self::restore_session(&*storage)?;

        Ok(Self {
            storage,
            settings,
            session: RwLock::new(session),
            write_lock: Mutex::new(())
        })
    }

    pub async fn current_user(&self) -> Option<User> {
        self.session.read().await.clone()
    }

    pub fn users(&self) -> Result<Vec<User>, IdentityError> {
        Ok(load_collection(&*self.storage, USERS_KEY)?)
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, IdentityError> {
        Ok(self.users()?.into_iter().find(|user| user.has_email(email)))
    }

    /// Checks credentials and opens a session.
    ///
    /// Unknown emails, inactive users and wrong passwords all fail the same way.
    pub async fn login(&self, email: &str, password: &str, remember_me: bool) -> Result<User, IdentityError> {
        sleep(self.settings.auth_latency).await;

        let Some(user) = self.find_by_email(email)? else {
            debug!("Login rejected, no user for [{email}]");
            return Err(IdentityError::InvalidCredentials)
        };

        if !user.is_active {
            debug!("Login rejected, user [{}] is inactive", user.id);
            return Err(IdentityError::InvalidCredentials)
        }

        if !bcrypt::verify(password, &user.password_hash)? {
            debug!("Login rejected, wrong password for user [{}]", user.id);
            return Err(IdentityError::InvalidCredentials)
        }

        if remember_me {
            save_value(&*self.storage, CURRENT_USER_KEY, &user)?;
        }

        *self.session.write().await = Some(user.clone());
        info!("User [{}] logged in", user.id);

        Ok(user)
    }

    /// Creates a regular user and logs them in with a remembered session.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, IdentityError> {
        sleep(self.settings.auth_latency).await;

        validate_profile(name, email)?;
        validate_password(password)?;

        let _guard = self.write_lock.lock().await;
        let mut users = self.users()?;

        if users.iter().any(|user| user.has_email(email)) {
            return Err(IdentityError::DuplicateEmail { email: email.trim().to_string() })
        }

        let user = User::new(name, email, bcrypt::hash(password, self.settings.password_cost)?, Role::User);
        users.push(user.clone());

        save_collection(&*self.storage, USERS_KEY, &users)?;
        save_value(&*self.storage, CURRENT_USER_KEY, &user)?;

        *self.session.write().await = Some(user.clone());
        info!("User [{}] registered", user.id);

        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), IdentityError> {
        if let Some(user) = self.session.write().await.take() {
            info!("User [{}] logged out", user.id);
        }

        self.storage.remove_item(CURRENT_USER_KEY)?;

        Ok(())
    }

    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<User, IdentityError> {
        sleep(self.settings.auth_latency).await;

        let session = self.require_session().await?;
        validate_password(new_password)?;

        let _guard = self.write_lock.lock().await;
        let mut users = self.users()?;
        let user = find_user_mut(&mut users, session.id)?;

        if !bcrypt::verify(current_password, &user.password_hash)? {
            return Err(IdentityError::IncorrectPassword { user_id: user.id })
        }

        user.password_hash = bcrypt::hash(new_password, self.settings.password_cost)?;
        let updated = user.clone();

        save_collection(&*self.storage, USERS_KEY, &users)?;
        self.refresh_session(&updated).await?;
        info!("User [{}] changed their password", updated.id);

        Ok(updated)
    }

    pub async fn update_profile(&self, name: &str, email: &str) -> Result<User, IdentityError> {
        sleep(self.settings.auth_latency).await;

        let session = self.require_session().await?;
        validate_profile(name, email)?;

        let _guard = self.write_lock.lock().await;
        let mut users = self.users()?;

        if users.iter().any(|user| user.id != session.id && user.has_email(email)) {
            return Err(IdentityError::DuplicateEmail { email: email.trim().to_string() })
        }

        let user = find_user_mut(&mut users, session.id)?;
        user.name = name.trim().to_string();
        user.email = normalize_email(email);
        let updated = user.clone();

        save_collection(&*self.storage, USERS_KEY, &users)?;
        self.refresh_session(&updated).await?;
        info!("User [{}] updated their profile", updated.id);

        Ok(updated)
    }

    /// Activates or deactivates a user. Requires an administrator session.
    pub async fn set_user_status(&self, user_id: UserId, is_active: bool) -> Result<User, IdentityError> {
        sleep(self.settings.auth_latency).await;

        let admin = self.require_admin().await?;

        if admin.id == user_id && !is_active {
            return Err(IdentityError::SelfDeactivation { user_id })
        }

        let _guard = self.write_lock.lock().await;
        let mut users = self.users()?;
        let user = find_user_mut(&mut users, user_id)?;
        user.is_active = is_active;
        let updated = user.clone();

        save_collection(&*self.storage, USERS_KEY, &users)?;
        info!("Administrator [{}] set user [{}] active={}", admin.id, user_id, is_active);

        Ok(updated)
    }

    /// Admin user search, case-insensitive on name or email. An empty query lists everyone.
    pub async fn search_users(&self, query: &str) -> Result<Vec<User>, IdentityError> {
        self.require_admin().await?;

        let query = query.trim().to_lowercase();

        Ok(self.users()?
            .into_iter()
            .filter(|user| user.name.to_lowercase().contains(&query) || user.email.contains(&query))
            .collect())
    }

    async fn require_session(&self) -> Result<User, IdentityError> {
        self.current_user().await.ok_or(IdentityError::NotAuthenticated)
    }

    async fn require_admin(&self) -> Result<User, IdentityError> {
        let user = self.require_session().await?;

        if !user.is_admin() {
            return Err(IdentityError::NotAuthorized { user_id: user.id })
        }

        Ok(user)
    }

    async fn refresh_session(&self, user: &User) -> Result<(), IdentityError> {
        if self.storage.get_item(CURRENT_USER_KEY)?.is_some() {
            save_value(&*self.storage, CURRENT_USER_KEY, user)?;
        }

        *self.session.write().await = Some(user.clone());

        Ok(())
    }

    fn restore_session(storage: &S) -> Result<Option<User>, IdentityError> {
        let Some(remembered) = load_value::<User, S>(storage, CURRENT_USER_KEY)? else {
            return Ok(None)
        };

        let users: Vec<User> = load_collection(storage, USERS_KEY)?;
        let current = users.into_iter().find(|user| user.id == remembered.id && user.is_active);

        match &current {
            Some(user) => info!("Restored session for user [{}]", user.id),
            None => {
                warn!("Remembered user [{}] is gone or inactive, clearing session", remembered.id);
                storage.remove_item(CURRENT_USER_KEY)?;
            }
        }

        Ok(current)
    }
}

fn find_user_mut(users: &mut [User], user_id: UserId) -> Result<&mut User, IdentityError> {
    users.iter_mut()
        .find(|user| user.id == user_id)
        .ok_or(IdentityError::UserNotFound { user_id })
}

fn validate_profile(name: &str, email: &str) -> Result<(), IdentityError> {
    if name.trim().is_empty() {
        return Err(IdentityError::InvalidInput("Name is required".to_string()))
    }

    let email = email.trim();

    if email.is_empty() || !email.contains('@') {
        return Err(IdentityError::InvalidInput(format!("Email '{email}' is not valid")))
    }

    Ok(())
}

fn validate_password(password: &str) -> Result<(), IdentityError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(IdentityError::WeakPassword { minimum: MIN_PASSWORD_LENGTH })
    }

    Ok(())
}
