use std::{error::Error as StdError, fmt};

use backtrace::Backtrace;
use http::StatusCode;
use thiserror::Error;

/// Identifier carried by every engine fault.
pub const ENGINE_ERROR_ID: &str = "store.engine.app_error";

pub trait ErrorCode: StdError + 'static {
    /// Status a caller layer should answer with, and the stable identifier.
    fn code(&self) -> (StatusCode, &'static str);
}

#[derive(Error, Debug)]
pub enum Code {
    #[error(transparent)]
    Any(#[from] anyhow::Error),
    #[error("Invalid field {field}. {id}")]
    Validation {
        id: &'static str,
        field: &'static str,
    },
    #[error("Missing record. {id}: {detail}")]
    MissingRecord { id: &'static str, detail: String },
    #[error("Insert conflict. {id}: {detail}")]
    InsertConflict { id: &'static str, detail: String },
    #[error("Not found. {id}: {detail}")]
    NotFound { id: &'static str, detail: String },
    #[error("Exists conflict. {id}: {detail}")]
    ExistsConflict { id: &'static str, detail: String },
}

impl ErrorCode for Code {
    fn code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Any(_) => (StatusCode::INTERNAL_SERVER_ERROR, ENGINE_ERROR_ID),
            Self::Validation { id, .. } => (StatusCode::BAD_REQUEST, *id),
            Self::MissingRecord { id, .. } => (StatusCode::BAD_REQUEST, *id),
            Self::InsertConflict { id, .. } => (StatusCode::CONFLICT, *id),
            Self::NotFound { id, .. } => (StatusCode::NOT_FOUND, *id),
            Self::ExistsConflict { id, .. } => (StatusCode::CONFLICT, *id),
        }
    }
}

pub struct WithBacktrace {
    source: Code,
    backtrace: Backtrace,
}

impl WithBacktrace {
    /// The stable identifier of this error.
    pub fn id(&self) -> &'static str {
        self.source.code().1
    }

    pub fn status(&self) -> StatusCode {
        self.source.code().0
    }

    pub fn kind(&self) -> &Code {
        &self.source
    }

    /// Field code of a validation failure, e.g. `group.name`.
    pub fn field(&self) -> Option<&'static str> {
        match self.source {
            Code::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl fmt::Debug for WithBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithBacktrace")
            .field("source", &self.source)
            .field("backtrace", &self.backtrace)
            .finish()
    }
}

impl fmt::Display for WithBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl StdError for WithBacktrace {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}

impl ErrorCode for WithBacktrace {
    fn code(&self) -> (StatusCode, &'static str) {
        self.source.code()
    }
}

impl From<Code> for WithBacktrace {
    fn from(code: Code) -> Self {
        WithBacktrace {
            source: code,
            backtrace: Backtrace::new(),
        }
    }
}

impl From<WithBacktrace> for Code {
    fn from(value: WithBacktrace) -> Self {
        value.source
    }
}

impl PartialEq for WithBacktrace {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

#[inline]
pub fn any<E: StdError>(err: E) -> WithBacktrace {
    Code::Any(anyhow::anyhow!("{}", err.to_string())).into()
}

#[inline]
pub fn anyhow(err: anyhow::Error) -> WithBacktrace {
    Code::Any(err).into()
}

#[inline]
pub fn validation(id: &'static str, field: &'static str) -> WithBacktrace {
    Code::Validation { id, field }.into()
}

#[inline]
pub fn missing_record<S: ToString + ?Sized>(
    id: &'static str,
    detail: &S,
) -> WithBacktrace {
    Code::MissingRecord {
        id,
        detail: detail.to_string(),
    }
    .into()
}

#[inline]
pub fn insert_conflict<S: ToString + ?Sized>(
    id: &'static str,
    detail: &S,
) -> WithBacktrace {
    Code::InsertConflict {
        id,
        detail: detail.to_string(),
    }
    .into()
}

#[inline]
pub fn not_found<S: ToString + ?Sized>(
    id: &'static str,
    detail: &S,
) -> WithBacktrace {
    Code::NotFound {
        id,
        detail: detail.to_string(),
    }
    .into()
}

#[inline]
pub fn exists_conflict<S: ToString + ?Sized>(
    id: &'static str,
    detail: &S,
) -> WithBacktrace {
    Code::ExistsConflict {
        id,
        detail: detail.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_per_kind() {
        assert_eq!(
            validation("model.group.name.app_error", "group.name").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            missing_record("store.sql_group.save.missing.app_error", "x")
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            insert_conflict("store.sql_group.save.insert.app_error", "x")
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            not_found("store.sql_group.get.app_error", "x").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            exists_conflict("store.sql_group.save_member.exists.app_error", "x")
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            anyhow(anyhow::anyhow!("connection reset")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn equality_follows_id() {
        let a = not_found("store.sql_group.get.app_error", "id=a");
        let b = not_found("store.sql_group.get.app_error", "id=b");
        assert_eq!(a, b);
        assert_ne!(a, any(fmt::Error));
    }

    #[test]
    fn validation_field() {
        let err = validation("model.group.type.app_error", "group.type");
        assert_eq!(err.id(), "model.group.type.app_error");
        assert_eq!(err.field(), Some("group.type"));
        assert_eq!(any(fmt::Error).field(), None);
        assert_eq!(any(fmt::Error).id(), ENGINE_ERROR_ID);
    }

    #[test]
    fn display_keeps_detail() {
        let err = missing_record("store.sql_group.save.missing.app_error", "id=abc");
        assert_eq!(
            err.to_string(),
            "Missing record. store.sql_group.save.missing.app_error: id=abc"
        );
        assert!(matches!(Code::from(err), Code::MissingRecord { .. }));
    }
}
