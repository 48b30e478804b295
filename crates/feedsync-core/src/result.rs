use crate::error::FeedError;

pub type FeedResult<T> = Result<T, FeedError>;
