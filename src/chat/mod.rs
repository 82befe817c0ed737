pub mod conversation;
pub mod display;
pub mod session;
pub mod topics;

pub use session::ChatSession;
