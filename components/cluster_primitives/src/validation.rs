use thiserror::Error;

const MAX_DB_NAME_LEN: usize = 30;

const COMMUNAL_SCHEMES: &[&str] = &["s3", "gs", "azb", "webhdfs", "swebhdfs"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("must specify a {0} name")]
    EmptyName(&'static str),

    #[error("invalid character in {kind} name {name:?}: {character:?}")]
    InvalidNameCharacter {
        kind: &'static str,
        name: String,
        character: char,
    },

    #[error("{kind} name {name:?} must start with a letter")]
    NameStart { kind: &'static str, name: String },

    #[error("{kind} name {name:?} is longer than {max} characters")]
    NameTooLong {
        kind: &'static str,
        name: String,
        max: usize,
    },

    #[error("must specify a host or host list")]
    MissingHosts,

    #[error("must specify a communal storage location")]
    MissingCommunalLocation,

    #[error("communal storage location {0:?} is invalid")]
    InvalidCommunalLocation(String),

    #[error("for a restore, must specify exactly one of (1-based) restore point index or id, not both or none")]
    RestorePointSelector,

    #[error("the number of new hosts ({hosts}) does not match the number of nodes ({nodes}) in original database")]
    HostCountMismatch { hosts: usize, nodes: usize },

    #[error("host {0} is given more than once")]
    DuplicateHost(String),

    #[error("{0}")]
    Other(String),
}

/// Check a database (or other object) name
///
/// Names start with a letter and contain only ASCII letters, digits and
/// underscores.
pub fn validate_db_name(name: &str, kind: &'static str) -> Result<(), ValidationError> {
    let first = name.chars().next().ok_or(ValidationError::EmptyName(kind))?;

    if let Some(character) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(ValidationError::InvalidNameCharacter {
            kind,
            name: name.to_string(),
            character,
        });
    }

    if !first.is_ascii_alphabetic() {
        return Err(ValidationError::NameStart {
            kind,
            name: name.to_string(),
        });
    }

    if name.len() > MAX_DB_NAME_LEN {
        return Err(ValidationError::NameTooLong {
            kind,
            name: name.to_string(),
            max: MAX_DB_NAME_LEN,
        });
    }

    Ok(())
}

/// Check a communal storage location
///
/// Accepts `scheme://path` for the object stores we support, or an
/// absolute local/NFS path.
pub fn validate_communal_location(location: &str) -> Result<(), ValidationError> {
    if location.is_empty() {
        return Err(ValidationError::MissingCommunalLocation);
    }
    if location.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidCommunalLocation(location.to_string()));
    }

    match location.split_once("://") {
        Some((scheme, rest)) => {
            let known = COMMUNAL_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str());
            if known && !rest.is_empty() && !rest.starts_with('/') {
                Ok(())
            } else {
                Err(ValidationError::InvalidCommunalLocation(location.to_string()))
            }
        }
        None if location.starts_with('/') => Ok(()),
        None => Err(ValidationError::InvalidCommunalLocation(location.to_string())),
    }
}
