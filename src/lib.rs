pub mod api;
pub mod backend;
pub mod chat;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod mode;
pub mod render;
pub mod session;
pub mod transport;
pub mod web_server;

pub use dispatcher::{DispatchReply, Dispatcher};
pub use mode::{DispatchTarget, Mode};
pub use session::{ChatSession, Message, MessageKind, Role};
