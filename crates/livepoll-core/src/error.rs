use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("not invited to this poll")]
    NotInvited,
    #[error("poll is past its deadline")]
    PollClosed,
    #[error("unknown option for this poll")]
    UnknownOption,
    #[error("vote cap reached for this poll")]
    VoteCapExceeded,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database error: {0}")]
    Database(#[from] livepoll_db::DbError),
}
