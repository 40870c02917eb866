// Metadata extractors
//
// Only the native yt-dlp binary is wired in; anything implementing
// `MetadataFetcher` can stand in for it.

mod cli;

pub use cli::CliMetadataFetcher;
