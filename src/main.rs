// media-downloader - inspect the formats of a URL and dispatch one download

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;

use media_downloader_lib::downloader::formatters::{format_bitrate, format_file_size};
use media_downloader_lib::{
    init_tracing, CliMetadataFetcher, DownloadError, DownloadMode, DownloaderSettings,
    FetchOutcome, ProgressEmitter, SearchController, SearchSession, SystemTerminator, VideoFormat,
    YtDlpEngine,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and download media formats with yt-dlp", long_about = None)]
struct Cli {
    /// Video or playlist URL
    url: String,

    /// Format id to download ("best" for the extractor's pick)
    #[arg(short, long)]
    format: Option<String>,

    /// Combine a video-only and an audio-only format
    #[arg(long, num_args = 2, value_names = ["VIDEO_ID", "AUDIO_ID"], conflicts_with = "format")]
    combine: Option<Vec<String>>,

    /// Comma-separated subtitle language codes
    #[arg(long, value_delimiter = ',')]
    subs: Vec<String>,

    /// 1-based playlist entry
    #[arg(long)]
    playlist_index: Option<String>,

    /// Dispatch the download instead of only printing the command
    #[arg(short, long)]
    download: bool,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Proxy URL passed to yt-dlp
    #[arg(long)]
    proxy: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, DownloadError> {
    let mut settings = match &cli.config {
        Some(path) => DownloaderSettings::load_from(path)?,
        None => DownloaderSettings::load(),
    };
    if cli.proxy.is_some() {
        settings = settings.with_proxy(cli.proxy.clone());
    }

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let controller = Arc::new(SearchController::new(
        settings.clone(),
        Arc::new(CliMetadataFetcher::new(settings.clone())),
        Arc::new(SystemTerminator),
        Arc::new(YtDlpEngine::new(settings).with_emitter(ProgressEmitter::new(progress_tx))),
    ));

    let outcome = tokio::select! {
        outcome = controller.submit(&cli.url) => outcome?,
        _ = tokio::signal::ctrl_c() => {
            controller.cancel().await?;
            eprintln!("Search cancelled");
            return Ok(ExitCode::from(130));
        }
    };
    if outcome != FetchOutcome::Loaded {
        eprintln!("{}", DownloadError::EmptyResult);
        return Ok(ExitCode::FAILURE);
    }

    controller.update_session(|session| apply_selection(session, &cli))?;
    controller.with_session(print_session);

    let command = controller.with_session(SearchSession::download_command)?;
    println!();
    println!("Command: -f {} {}", command.format_token, command.source_url);
    if let Some(langs) = &command.subtitle_langs {
        println!("  subtitles: {}", langs);
    }
    if let Some(index) = &command.playlist_index {
        println!("  playlist item: {}", index);
    }
    if let Some(container) = &command.container_override {
        println!("  container: {}", container);
    }

    if !cli.download {
        return Ok(ExitCode::SUCCESS);
    }

    controller.start_download().await?;
    while let Some(progress) = progress_rx.recv().await {
        println!("[{:>5.1}%] {}", progress.percent, progress.status);
        if progress.status.starts_with("Download complete") {
            return Ok(ExitCode::SUCCESS);
        }
        if progress.status.starts_with("Download failed") {
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn apply_selection(session: &mut SearchSession, cli: &Cli) -> Result<(), DownloadError> {
    if let Some(index) = &cli.playlist_index {
        session.select_playlist_index(index)?;
    }

    if let Some(pair) = &cli.combine {
        if !session.catalog().supports_combine() {
            return Err(DownloadError::IncompleteSelection(
                "this source has no separate video and audio streams".to_string(),
            ));
        }
        session.set_mode(DownloadMode::Combine);
        if let [video, audio] = pair.as_slice() {
            session.select_combine_video(video.as_str());
            session.select_combine_audio(audio.as_str());
        }
    } else if let Some(format) = &cli.format {
        session.select_format(format.as_str());
    }

    session.set_subtitles(cli.subs.iter().map(|s| s.trim()).filter(|s| !s.is_empty()));
    Ok(())
}

fn print_session(session: &SearchSession) {
    if let Some(header) = session.playlist_header() {
        println!(
            "Playlist: {} by {} ({} entries, {})",
            header.title, header.channel, header.entry_count, header.extractor
        );
    }
    if let Some(overview) = session.overview() {
        println!("{}", overview.title);
        println!(
            "  {} • {} • {} views • {} likes • {}",
            overview.uploader, overview.duration, overview.views, overview.likes, overview.upload_date
        );
    }

    let catalog = session.catalog();
    print_formats("Quality presets", &catalog.quality_presets);
    print_formats("Video + audio", &catalog.combined);
    print_formats("Video only", &catalog.video_only);
    print_formats("Audio only", &catalog.audio_only);

    let languages = session.subtitle_languages();
    if !languages.is_empty() {
        let codes: Vec<String> = languages
            .iter()
            .map(|l| format!("{} ({})", l.code, l.name))
            .collect();
        println!("Subtitles: {}", codes.join(", "));
    }

    println!();
    println!("Type: {}", session.active_file_type());
    if let Some(line) = session.summary_line() {
        println!("Selected: {}", line);
    }
}

fn print_formats(title: &str, formats: &[VideoFormat]) {
    if formats.is_empty() {
        return;
    }
    println!();
    println!("{}:", title);
    for f in formats {
        println!(
            "  {:<12} {:<5} {:<11} {:>10} {:>10}  {}",
            f.format_id,
            f.ext,
            f.resolution.as_deref().unwrap_or("-"),
            f.tbr.map(format_bitrate).unwrap_or_else(|| "-".to_string()),
            f.filesize_approx
                .or(f.filesize)
                .map(format_file_size)
                .unwrap_or_else(|| "-".to_string()),
            f.format_note.as_deref().unwrap_or(""),
        );
    }
}
