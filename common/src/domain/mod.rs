use std::sync::LazyLock;

use nutype::nutype;
use regex::Regex;

pub mod article;
pub mod clock;
pub mod countdown;
pub mod funnel;
pub mod layout;
pub mod session;
pub mod store;
pub mod verification;
pub mod visibility;

// Ids may contain only ASCII letters, digits, dash and underscore.
// Example: "a1b2c3d4" or "launch_2026" is valid; "a/b" or "a b" are not.
pub const ELIGIBLE_SYMBOLS_REGEX: &str = r"^[A-Za-z0-9_-]+$";

static ELIGIBLE_SYMBOLS_REGEX_COMPILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(ELIGIBLE_SYMBOLS_REGEX).expect("ELIGIBLE_SYMBOLS_REGEX must be a valid regex")
});

static TARGET_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^\s/?#]+[^\s]*$").expect("TARGET_URL_REGEX must be a valid regex")
});

pub fn is_eligible_id(id: &str) -> bool {
    ELIGIBLE_SYMBOLS_REGEX_COMPILED.is_match(id)
}

#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 64, predicate = is_eligible_id),
    derive(
        Clone,
        Debug,
        Display,
        FromStr,
        AsRef,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize
    )
)]
pub struct ArticleId(String);

impl ArticleId {
    /// Fresh random id for a newly created article.
    pub fn generate() -> Self {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        Self::try_new(raw).expect("uuid simple form is always an eligible id")
    }
}

#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 200),
    derive(Clone, Debug, Display, AsRef, PartialEq, Eq, Hash, Serialize, Deserialize)
)]
pub struct ArticleTitle(String);

#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 40),
    derive(
        Clone,
        Debug,
        Display,
        FromStr,
        AsRef,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize
    )
)]
pub struct Category(String);

/// Destination a completed funnel sends the visitor to.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 2048, regex = TARGET_URL_REGEX),
    derive(Clone, Debug, Display, AsRef, PartialEq, Eq, Hash, Serialize, Deserialize)
)]
pub struct TargetUrl(String);
