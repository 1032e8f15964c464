//! Identity utilities
//!
//! Identities travel as strings but may arrive spelled differently (upper
//! case, simple, braced or urn UUID forms). Every authorship and likership
//! comparison in the services goes through [`normalize`] / [`same_identity`].

use uuid::Uuid;

/// Generate a new identity (UUIDv4, canonical form)
pub fn generate() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Canonical string form of an identity
///
/// UUIDs collapse to the lowercase hyphenated form. Anything else is
/// only trimmed.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    match Uuid::parse_str(trimmed) {
        Ok(id) => id.hyphenated().to_string(),
        Err(_) => trimmed.to_string(),
    }
}

/// Compare two identities by canonical form
pub fn same_identity(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Membership test using canonical comparison
pub fn contains_identity<I, S>(identities: I, needle: &str) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let needle = normalize(needle);
    identities
        .into_iter()
        .any(|candidate| normalize(candidate.as_ref()) == needle)
}
