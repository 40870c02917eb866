// Download backends

pub mod process;
pub mod ytdlp;

pub use process::SystemTerminator;
pub use ytdlp::{parse_ytdlp_progress, YtDlpEngine};
