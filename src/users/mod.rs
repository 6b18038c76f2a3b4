//! User directory: phone-keyed accounts created on first successful login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Clock;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub phone: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: usize,
    pub page_size: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserPage {
    pub items: Vec<User>,
    pub total: usize,
}

pub trait UserDirectory: Send + Sync {
    /// Return the user registered with `phone`, creating it on first sight.
    fn upsert_by_phone(&self, phone: &str) -> User;

    fn lookup(&self, id: Uuid) -> Option<User>;

    /// Newest first, filtered by a case-insensitive substring of phone or id.
    fn list(&self, query: &ListQuery) -> UserPage;
}

#[derive(Default)]
struct Users {
    by_id: HashMap<Uuid, User>,
    by_phone: HashMap<String, Uuid>,
}

pub struct MemoryUserDirectory {
    clock: Arc<dyn Clock>,
    users: RwLock<Users>,
}

impl MemoryUserDirectory {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            users: RwLock::new(Users::default()),
        }
    }
}

impl UserDirectory for MemoryUserDirectory {
    fn upsert_by_phone(&self, phone: &str) -> User {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(user) = users
            .by_phone
            .get(phone)
            .and_then(|id| users.by_id.get(id))
        {
            return user.clone();
        }

        let user = User {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            registered_at: self.clock.now(),
        };
        users.by_phone.insert(user.phone.clone(), user.id);
        users.by_id.insert(user.id, user.clone());
        user
    }

    fn lookup(&self, id: Uuid) -> Option<User> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users.by_id.get(&id).cloned()
    }

    fn list(&self, query: &ListQuery) -> UserPage {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);

        let needle = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut matched: Vec<&User> = users
            .by_id
            .values()
            .filter(|user| {
                needle.as_deref().map_or(true, |needle| {
                    user.phone.to_lowercase().contains(needle)
                        || user.id.to_string().contains(needle)
                })
            })
            .collect();
        matched.sort_by(|a, b| {
            b.registered_at
                .cmp(&a.registered_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = matched.len();
        let page = query.page.max(1);
        let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);
        let start = (page - 1).saturating_mul(page_size);

        let items = matched
            .into_iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect();

        UserPage { items, total }
    }
}
