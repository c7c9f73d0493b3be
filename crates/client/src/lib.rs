pub mod client;
pub mod command;
pub mod error;
pub mod process;

pub use client::{BackendInfo, Reply, TantoClient};
pub use command::{GlobalOptions, MessageIcon, TantoCommand};
pub use error::TantoError;
pub use process::{ProcessRunner, RawOutput, Runner, TantoProcess};
