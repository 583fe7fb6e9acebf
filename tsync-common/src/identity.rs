//! Identity key derivation
//!
//! Two records denote the same testimonial iff their identity keys are
//! equal. The key is `normalize(name) | normalize(company)`, where
//! normalization trims surrounding whitespace and lowercases.
//!
//! This is the only place identity is computed; both the existing-collection
//! index and the incoming lookup go through [`Identity::identity_key`].

use crate::record::{Recommendation, Testimonial};

/// Separator between the normalized name and company
pub const KEY_SEPARATOR: char = '|';

/// Derive the identity key for a name/company pair
///
/// Pure and total.
pub fn identity_key(name: &str, company: &str) -> String {
    let name = normalize(name);
    let company = normalize(company);

    let mut key = String::with_capacity(name.len() + company.len() + 1);
    key.push_str(&name);
    key.push(KEY_SEPARATOR);
    key.push_str(&company);
    key
}

fn normalize(field: &str) -> String {
    field.trim().to_lowercase()
}

/// Anything carrying the identity fields
pub trait Identity {
    fn identity_name(&self) -> &str;
    fn identity_company(&self) -> &str;

    fn identity_key(&self) -> String {
        identity_key(self.identity_name(), self.identity_company())
    }
}

impl Identity for Recommendation {
    fn identity_name(&self) -> &str {
        &self.name
    }

    fn identity_company(&self) -> &str {
        &self.company
    }
}

impl Identity for Testimonial {
    fn identity_name(&self) -> &str {
        &self.name
    }

    fn identity_company(&self) -> &str {
        &self.company
    }
}
