pub mod comment;
pub mod event;
pub mod poll;

pub use comment::{Comment, CommentPage};
pub use event::WsEvent;
pub use poll::{Poll, PollOption, Visibility};
