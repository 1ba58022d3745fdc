//! Shared data types for vault contents.

use keepass::db::{Node, Value};
use uuid::Uuid;

pub const TITLE: &str = "Title";
pub const USERNAME: &str = "UserName";
pub const PASSWORD: &str = "Password";
pub const URL: &str = "URL";
pub const NOTES: &str = "Notes";

/// Keys stored in dedicated [`Entry`] fields rather than in `custom`.
pub const STANDARD_KEYS: [&str; 5] = [TITLE, USERNAME, PASSWORD, URL, NOTES];

/// One (key, value, protected?) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: String,
    pub value: String,
    pub protected: bool,
}

impl Field {
    pub fn plain(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            protected: false,
        }
    }

    pub fn protected(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            protected: true,
        }
    }
}

/// Represents a password entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub uuid: Uuid,
    pub title: String,
    pub username: String,
    pub password: String,
    pub url: String,
    pub notes: String,
    /// Every attribute that is not one of [`STANDARD_KEYS`].
    pub custom: Vec<Field>,
}

impl Default for Entry {
    fn default() -> Self {
        Self::new()
    }
}

impl Entry {
    /// Create an empty entry with a fresh UUID.
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            title: String::new(),
            username: String::new(),
            password: String::new(),
            url: String::new(),
            notes: String::new(),
            custom: Vec::new(),
        }
    }

    /// Lowercase hex of the UUID, no separators.
    pub fn uuid_hex(&self) -> String {
        self.uuid.simple().to_string()
    }

    /// Look up any attribute by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            TITLE => Some(&self.title),
            USERNAME => Some(&self.username),
            PASSWORD => Some(&self.password),
            URL => Some(&self.url),
            NOTES => Some(&self.notes),
            _ => self
                .custom
                .iter()
                .find(|f| f.key == key)
                .map(|f| f.value.as_str()),
        }
    }

    /// Attribute value or the empty string.
    pub fn attribute(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    /// Set an unprotected attribute. Custom keys keep their first position.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.set_field(Field::plain(key, value));
    }

    /// Set a protected attribute.
    pub fn set_protected(&mut self, key: &str, value: impl Into<String>) {
        self.set_field(Field::protected(key, value));
    }

    fn set_field(&mut self, field: Field) {
        match field.key.as_str() {
            TITLE => self.title = field.value,
            USERNAME => self.username = field.value,
            PASSWORD => self.password = field.value,
            URL => self.url = field.value,
            NOTES => self.notes = field.value,
            _ => match self.custom.iter_mut().find(|f| f.key == field.key) {
                Some(existing) => *existing = field,
                None => self.custom.push(field),
            },
        }
    }

    /// Builder form of [`Entry::set`].
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder form of [`Entry::set_protected`].
    pub fn with_protected(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_protected(key, value);
        self
    }

    /// Values of all custom attributes joined by a single space.
    ///
    /// Joined in the order of `custom`. Entries read from a KDBX file have
    /// their custom attributes sorted by key, not by insertion, because the
    /// `keepass` codec stores fields in a `HashMap`.
    pub fn custom_values(&self) -> String {
        self.custom
            .iter()
            .map(|f| f.value.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// All attributes: standard keys first, then custom ones.
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = vec![
            Field::plain(TITLE, self.title.clone()),
            Field::plain(USERNAME, self.username.clone()),
            Field::protected(PASSWORD, self.password.clone()),
            Field::plain(URL, self.url.clone()),
            Field::plain(NOTES, self.notes.clone()),
        ];
        fields.extend(self.custom.iter().cloned());
        fields
    }

    /// Convert a keepass::Entry to our Entry model.
    pub(crate) fn from_keepass(ke: &keepass::db::Entry) -> Self {
        let mut custom = Vec::new();

        for (key, value) in &ke.fields {
            if STANDARD_KEYS.contains(&key.as_str()) {
                continue;
            }
            // Binary attachments carry no text
            let Some(text) = ke.get(key) else {
                continue;
            };
            custom.push(Field {
                key: key.clone(),
                value: text.to_string(),
                protected: matches!(value, Value::Protected(_)),
            });
        }
        // The codec keeps attributes in a hash map; sort for a stable order
        custom.sort_by(|a, b| a.key.cmp(&b.key));

        Self {
            uuid: ke.uuid,
            title: ke.get_title().unwrap_or_default().to_string(),
            username: ke.get_username().unwrap_or_default().to_string(),
            password: ke.get_password().unwrap_or_default().to_string(),
            url: ke.get_url().unwrap_or_default().to_string(),
            notes: ke.get(NOTES).unwrap_or_default().to_string(),
            custom,
        }
    }

    /// Convert back into a keepass::Entry, protecting flagged values.
    pub(crate) fn to_keepass(&self) -> keepass::db::Entry {
        let mut entry = keepass::db::Entry::new();
        entry.uuid = self.uuid;

        for field in self.fields() {
            let value = if field.protected {
                Value::Protected(field.value.as_bytes().into())
            } else {
                Value::Unprotected(field.value)
            };
            entry.fields.insert(field.key, value);
        }

        entry
    }
}

/// Represents a group (folder) in the database tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub uuid: Uuid,
    pub name: String,
    pub groups: Vec<Group>,
    pub entries: Vec<Entry>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            groups: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Convert a keepass::Group to our Group model.
    pub(crate) fn from_keepass(kg: &keepass::db::Group) -> Self {
        let mut group = Self {
            uuid: kg.uuid,
            name: kg.name.clone(),
            groups: Vec::new(),
            entries: Vec::new(),
        };

        for node in &kg.children {
            match node {
                Node::Group(g) => group.groups.push(Self::from_keepass(g)),
                Node::Entry(e) => group.entries.push(Entry::from_keepass(e)),
            }
        }

        group
    }
}
