//! Folding of property tokens into the table handed to the compiler.
//!
//! Both flag forms feed [`merge`] as tagged [`PropertySource`] values, so the
//! last-write-wins rule and the duplicate-key rule live only here.

use std::collections::HashSet;

use super::PropertyError;
use super::tokenizer::{PropertyForm, Token, tokenize};

pub const DEPRECATION_NOTICE: &str =
    "Flag --build-properties has been deprecated, please use --build-property instead.";

/// One raw flag occurrence, in command-line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertySource {
    Single(String),
    Combined(String),
}

impl PropertySource {
    pub fn form(&self) -> PropertyForm {
        match self {
            PropertySource::Single(_) => PropertyForm::Single,
            PropertySource::Combined(_) => PropertyForm::Combined,
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            PropertySource::Single(raw) | PropertySource::Combined(raw) => raw,
        }
    }
}

/// A parsed pair plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyOverride {
    pub key: String,
    pub value: String,
    pub quoted: bool,
    /// 1-based index of the flag occurrence that produced this pair.
    pub occurrence: usize,
    pub form: PropertyForm,
}

impl PropertyOverride {
    fn from_token(token: Token, occurrence: usize, form: PropertyForm) -> Self {
        Self {
            key: token.key,
            value: token.value,
            quoted: token.quoted,
            occurrence,
            form,
        }
    }

    pub fn is_deprecated(&self) -> bool {
        self.form == PropertyForm::Combined
    }

    /// `key=value` with the value exactly as parsed.
    pub fn to_arg(&self) -> String {
        format!("{}={}", self.key, self.value)
    }

    /// `key=value`, restoring the wrapping quotes if the input had them.
    pub fn serialize(&self) -> String {
        if self.quoted {
            format!("{}=\"{}\"", self.key, self.value)
        } else {
            self.to_arg()
        }
    }
}

/// Ordered key -> value mapping. Keys are unique; a replaced key keeps its slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyTable {
    entries: Vec<PropertyOverride>,
}

impl PropertyTable {
    pub fn insert(&mut self, entry: PropertyOverride) {
        match self.entries.iter_mut().find(|e| e.key == entry.key) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entry(key).map(|e| e.value.as_str())
    }

    pub fn entry(&self, key: &str) -> Option<&PropertyOverride> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyOverride> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_args(&self) -> Vec<String> {
        self.entries.iter().map(PropertyOverride::to_arg).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergedProperties {
    pub table: PropertyTable,
    /// Set once if any `--build-properties` occurrence was used.
    pub deprecated_form_used: bool,
}

/// Folds every flag occurrence into one [`PropertyTable`].
pub fn merge(sources: &[PropertySource]) -> Result<MergedProperties, PropertyError> {
    let mut merged = MergedProperties::default();

    for (idx, source) in sources.iter().enumerate() {
        let occurrence = idx + 1;
        let form = source.form();
        let tokens = tokenize(source.raw(), form)?;

        if form == PropertyForm::Combined {
            merged.deprecated_form_used = true;
            let mut seen = HashSet::new();
            for token in &tokens {
                if !seen.insert(token.key.as_str()) {
                    return Err(PropertyError::DuplicateKey {
                        key: token.key.clone(),
                        occurrence,
                    });
                }
            }
        }

        for token in tokens {
            tracing::debug!(key = %token.key, occurrence, flag = form.flag(), "build property");
            merged
                .table
                .insert(PropertyOverride::from_token(token, occurrence, form));
        }
    }

    Ok(merged)
}
