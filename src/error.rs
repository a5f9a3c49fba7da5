use thiserror::Error;

/// Why one page's markup could not be turned into notice rows.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid date {text:?} (expected YYYY.MM.DD)")]
    Date {
        text: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("invalid view count {text:?}")]
    ViewCount {
        text: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("row {row}: link container has no a.itembx[href]")]
    MissingLink { row: usize },
    #[error("field columns are misaligned: {lengths:?}")]
    Misaligned { lengths: [usize; 6] },
}

/// Transport-level failure for a single page request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },
}

/// Anything that aborts a scrape cycle. The previous snapshot is kept.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("page {page}: {source}")]
    Transport {
        page: u32,
        #[source]
        source: FetchError,
    },
    #[error("page {page}: {source}")]
    Parse {
        page: u32,
        #[source]
        source: ParseError,
    },
    #[error("snapshot replace failed: {0}")]
    Storage(#[from] rusqlite::Error),
}
