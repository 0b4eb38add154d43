//! Contact resolution for the call screen

use std::collections::HashMap;
use std::sync::RwLock;

use super::calls::events;
use super::client::{ApiClient, ApiError};
use crate::call::{CallError, CallResult};
use crate::models::{normalize_number, Contact, ContactDisplay};

/// Resolves a phone number to what the call screen should show
pub trait ContactResolver: Send + Sync {
    fn resolve(&self, number: &str) -> Option<ContactDisplay>;

    /// Like `resolve`, but a miss is an `UnresolvedContact` error
    fn lookup(&self, number: &str) -> CallResult<ContactDisplay> {
        self.resolve(number)
            .ok_or_else(|| CallError::UnresolvedContact(number.to_string()))
    }
}

/// In-memory contact cache keyed by normalized number
#[derive(Default)]
pub struct ContactDirectory {
    contacts: RwLock<HashMap<String, Contact>>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn from_contacts(contacts: Vec<Contact>) -> Self {
        let directory = Self::new();
        directory.replace_all(contacts);
        directory
    }

    /// Swap in a fresh contact list
    pub fn replace_all(&self, contacts: Vec<Contact>) {
        let map = contacts
            .into_iter()
            .map(|c| (normalize_number(&c.number), c))
            .filter(|(number, _)| !number.is_empty())
            .collect();
        *self.contacts.write().unwrap_or_else(|e| e.into_inner()) = map;
    }

    pub fn len(&self) -> usize {
        self.contacts.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch the contact list from the game client and cache it
    pub async fn load(&self, client: &ApiClient) -> Result<usize, ApiError> {
        let contacts: Vec<Contact> = client.post(events::GET_CONTACTS, &serde_json::json!({})).await?;
        let count = contacts.len();
        self.replace_all(contacts);
        tracing::info!("Loaded {} contacts", count);
        Ok(count)
    }
}

impl ContactResolver for ContactDirectory {
    fn resolve(&self, number: &str) -> Option<ContactDisplay> {
        let key = normalize_number(number);
        self.contacts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .map(ContactDisplay::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(display: &str, number: &str) -> Contact {
        Contact {
            id: 1,
            display: display.to_string(),
            number: number.to_string(),
            avatar: None,
        }
    }

    #[test]
    fn test_resolve_ignores_formatting() {
        let directory = ContactDirectory::from_contacts(vec![contact("Mia", "555-1234")]);

        assert_eq!(directory.resolve("5551234").unwrap().display_name, "Mia");
        assert_eq!(directory.resolve("555 1234").unwrap().display_name, "Mia");
        assert!(directory.resolve("5550000").is_none());
    }

    #[test]
    fn test_lookup_miss_is_unresolved() {
        let directory = ContactDirectory::new();
        assert_eq!(
            directory.lookup("5551234").unwrap_err(),
            CallError::UnresolvedContact("5551234".into())
        );
    }

    #[test]
    fn test_replace_all() {
        let directory = ContactDirectory::from_contacts(vec![contact("Mia", "5551234"), contact("Blank", "")]);
        assert_eq!(directory.len(), 1);

        directory.replace_all(vec![contact("Mia R.", "5551234"), contact("Leo", "5559876")]);
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.resolve("5551234").unwrap().display_name, "Mia R.");

        directory.replace_all(Vec::new());
        assert!(directory.is_empty());
    }
}
