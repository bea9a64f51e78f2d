use clap::Parser;

/// Publishes record collection entries as static site pages.
#[derive(Parser, Debug)]
#[command(name = "sleeve")]
#[command(version)]
pub struct Args {
    /// Log at debug level
    #[arg(long)]
    pub debug: bool,

    /// Reset the processing registry before running
    #[arg(long)]
    pub force: bool,

    /// Check catalog and cache connectivity, then exit
    #[arg(long)]
    pub test: bool,

    /// Publish a single release by artist (requires --title)
    #[arg(long, requires = "title")]
    pub artist: Option<String>,

    /// Release title for a single run (requires --artist)
    #[arg(long, requires = "artist")]
    pub title: Option<String>,

    /// Maximum number of unprocessed releases to publish
    #[arg(long)]
    pub limit: Option<usize>,

    /// Answer yes to every prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Resolve and render without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl Args {
    pub fn manual(&self) -> Option<(&str, &str)> {
        match (&self.artist, &self.title) {
            (Some(artist), Some(title)) => Some((artist, title)),
            _ => None,
        }
    }
}
