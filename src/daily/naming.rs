use chrono::NaiveDate;
use crate::interfaces::blob_store::FileQuery;
use crate::types::ids::FolderId;
use crate::utils::hash::{file_name_hash, FILE_NAME_HASH_LEN};
use crate::utils::helper::{compact_date, dashed_date, sanitize_user_name};

const EXTENSION: &str = ".json";

/// Day-file naming formats, newest first.
///
/// - `Current`: `YYYYMMDD_<user>_<16 hex>.json`, the hash derived from date
///   and user only
/// - `LegacyDashed`: `YYYY-MM-DD_<user>.json`, accepted for reading and
///   migrated on first write
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NamingScheme {
    Current,
    LegacyDashed,
}

/// Order in which resolver strategies are tried.
pub const RESOLVER_ORDER: [NamingScheme; 2] = [NamingScheme::Current, NamingScheme::LegacyDashed];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedName {
    pub scheme: NamingScheme,
    pub date: NaiveDate,
    pub user: String,
}

impl NamingScheme {
    pub fn is_legacy(self) -> bool {
        self != NamingScheme::Current
    }

    /// File name for an already sanitized user.
    pub fn file_name(self, date: NaiveDate, sanitized_user: &str) -> String {
        match self {
            NamingScheme::Current => {
                let day = compact_date(date);
                let hash = file_name_hash(&day, sanitized_user);
                format!("{}_{}_{}{}", day, sanitized_user, hash, EXTENSION)
            }
            NamingScheme::LegacyDashed => {
                format!("{}_{}{}", dashed_date(date), sanitized_user, EXTENSION)
            }
        }
    }

    pub fn parse(self, name: &str) -> Option<ParsedName> {
        let stem = name.strip_suffix(EXTENSION)?;
        match self {
            NamingScheme::Current => {
                let (day, rest) = split_prefix(stem, 8)?;
                let date = NaiveDate::parse_from_str(day, "%Y%m%d").ok()?;
                let (user, hash) = rest.rsplit_once('_')?;
                let well_formed = hash.len() == FILE_NAME_HASH_LEN
                    && hash.chars().all(|c| c.is_ascii_hexdigit())
                    && !user.is_empty();
                // A name whose hash does not match its own date and user was
                // not produced by this scheme.
                if !well_formed || file_name_hash(day, user) != hash {
                    return None;
                }
                Some(ParsedName { scheme: self, date, user: user.to_string() })
            }
            NamingScheme::LegacyDashed => {
                let (day, user) = split_prefix(stem, 10)?;
                let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;
                if user.is_empty() {
                    return None;
                }
                Some(ParsedName { scheme: self, date, user: user.to_string() })
            }
        }
    }

    /// Listing predicate that narrows the folder to this scheme's files for
    /// one user. Names still have to go through [`NamingScheme::parse`].
    pub fn listing_query(self, folder: &FolderId, sanitized_user: &str) -> FileQuery {
        let fragment = match self {
            NamingScheme::Current => format!("_{}_", sanitized_user),
            NamingScheme::LegacyDashed => format!("_{}{}", sanitized_user, EXTENSION),
        };
        FileQuery::All(vec![
            FileQuery::InFolder(folder.clone()),
            FileQuery::NameContains(fragment),
        ])
    }
}

// `<prefix of len>_<rest>`
fn split_prefix(stem: &str, len: usize) -> Option<(&str, &str)> {
    if !stem.is_char_boundary(len) {
        return None;
    }
    let (prefix, rest) = stem.split_at(len);
    rest.strip_prefix('_').map(|rest| (prefix, rest))
}

/// Deterministic current-format name for `(date, user identity)`. Same inputs,
/// same name, whatever the clock says or how often it is called.
pub fn resolve_file_name(date: NaiveDate, user_identity: &str) -> String {
    NamingScheme::Current.file_name(date, &sanitize_user_name(user_identity))
}

/// Recognises a day-file name under any known scheme.
pub fn parse_file_name(name: &str) -> Option<ParsedName> {
    RESOLVER_ORDER.iter().find_map(|scheme| scheme.parse(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn current_name_shape() {
        let name = resolve_file_name(date(), "Alice Chen");
        assert!(name.starts_with("20240301_Alice_Chen_"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "20240301_Alice_Chen_".len() + FILE_NAME_HASH_LEN + ".json".len());
    }

    #[test]
    fn resolution_is_deterministic() {
        assert_eq!(resolve_file_name(date(), "alice"), resolve_file_name(date(), "alice"));
        assert_ne!(resolve_file_name(date(), "alice"), resolve_file_name(date(), "bob"));
    }

    #[test]
    fn parses_both_schemes() {
        let current = resolve_file_name(date(), "alice_w");
        let parsed = parse_file_name(&current).unwrap();
        assert_eq!(parsed, ParsedName { scheme: NamingScheme::Current, date: date(), user: "alice_w".into() });

        let legacy = parse_file_name("2024-03-01_alice_w.json").unwrap();
        assert_eq!(legacy, ParsedName { scheme: NamingScheme::LegacyDashed, date: date(), user: "alice_w".into() });
    }

    #[test]
    fn rejects_foreign_names() {
        assert!(parse_file_name("settings.json").is_none());
        assert!(parse_file_name("20240301_alice_0000000000000000.json").is_none());
        assert!(parse_file_name("2024-13-01_alice.json").is_none());
        assert!(parse_file_name("2024-03-01_.json").is_none());
        assert!(parse_file_name("20240301_alice.txt").is_none());
    }

    #[test]
    fn listing_query_matches_own_names_only() {
        use chrono::Utc;
        use crate::interfaces::blob_store::FileMeta;
        use crate::types::ids::FileId;

        let folder = FolderId::from("f");
        let meta = |name: &str| FileMeta {
            id: FileId::from("x"),
            name: name.to_string(),
            parent: Some(folder.clone()),
            created_at: Utc::now(),
            modified_at: Utc::now(),
        };

        let current = NamingScheme::Current.listing_query(&folder, "alice");
        assert!(current.matches(&meta(&resolve_file_name(date(), "alice"))));
        let legacy = NamingScheme::LegacyDashed.listing_query(&folder, "alice");
        assert!(legacy.matches(&meta("2024-03-01_alice.json")));
        assert!(!legacy.matches(&meta("2024-03-01_malice.json")));
        // Fragment hits still need an exact user match after parsing.
        assert!(legacy.matches(&meta("2024-03-01_bob_alice.json")));
        assert_eq!(parse_file_name("2024-03-01_bob_alice.json").unwrap().user, "bob_alice");
    }
}
