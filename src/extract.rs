//! Notice-board markup → typed notice rows.
//!
//! The board renders each field in its own cell class, so every field is
//! selected as an independent column and rows are rebuilt by position.

use std::sync::LazyLock;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::db::NoticeRow;
use crate::error::ParseError;

/// Sequence number stored for pinned notices (non-numeric markers).
pub const PINNED_SEQUENCE: i64 = 9_999_999;

const DATE_FORMAT: &str = "%Y.%m.%d";

static SEQUENCE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th.step1").unwrap());
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span.tit").unwrap());
static AUTHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td.step3").unwrap());
static DATE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td.step4").unwrap());
static VIEWS_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td.step6").unwrap());
static LINK_CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td.step2").unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.itembx[href]").unwrap());

/// What to do when the six field columns have different lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Keep the first `min(len)` rows and drop trailing unmatched cells.
    #[default]
    Truncate,
    /// Reject the page.
    Strict,
}

/// The six field columns of one page, in document order.
pub struct Columns<'a> {
    sequence: Vec<ElementRef<'a>>,
    title: Vec<ElementRef<'a>>,
    author: Vec<ElementRef<'a>>,
    date: Vec<ElementRef<'a>>,
    views: Vec<ElementRef<'a>>,
    link: Vec<ElementRef<'a>>,
}

impl<'a> Columns<'a> {
    pub fn select(doc: &'a Html) -> Self {
        Self {
            sequence: doc.select(&SEQUENCE_SEL).collect(),
            title: doc.select(&TITLE_SEL).collect(),
            author: doc.select(&AUTHOR_SEL).collect(),
            date: doc.select(&DATE_SEL).collect(),
            views: doc.select(&VIEWS_SEL).collect(),
            link: doc.select(&LINK_CELL_SEL).collect(),
        }
    }

    pub fn lengths(&self) -> [usize; 6] {
        [
            self.sequence.len(),
            self.title.len(),
            self.author.len(),
            self.date.len(),
            self.views.len(),
            self.link.len(),
        ]
    }

    /// Lazily rebuild rows by position. The alignment check happens up front;
    /// field parsing happens as the iterator is driven.
    pub fn rows(
        self,
        alignment: Alignment,
    ) -> Result<impl Iterator<Item = Result<NoticeRow, ParseError>> + 'a, ParseError> {
        let lengths = self.lengths();
        let count = lengths.iter().copied().min().unwrap_or(0);

        if lengths.iter().any(|&len| len != count) {
            match alignment {
                Alignment::Strict => return Err(ParseError::Misaligned { lengths }),
                Alignment::Truncate => warn!(
                    ?lengths,
                    kept = count,
                    "Ragged notice columns; trailing cells dropped"
                ),
            }
        }

        Ok((0..count).map(move |i| self.row(i)))
    }

    fn row(&self, i: usize) -> Result<NoticeRow, ParseError> {
        Ok(NoticeRow {
            sequence_number: parse_sequence(&text_of(self.sequence[i])),
            title: text_of(self.title[i]),
            author: text_of(self.author[i]),
            published_date: parse_date(&text_of(self.date[i]))?,
            view_count: parse_views(&text_of(self.views[i]))?,
            link: link_of(self.link[i]).ok_or(ParseError::MissingLink { row: i })?,
        })
    }
}

/// Parse one page into notice rows. Any bad field fails the whole page.
pub fn extract_page(html: &str, alignment: Alignment) -> Result<Vec<NoticeRow>, ParseError> {
    let doc = Html::parse_document(html);
    let rows = Columns::select(&doc).rows(alignment)?;
    rows.collect()
}

/// Digits-only markers become the sequence number; anything else is pinned.
pub fn parse_sequence(text: &str) -> i64 {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return PINNED_SEQUENCE;
    }
    text.parse().unwrap_or(PINNED_SEQUENCE)
}

pub fn parse_date(text: &str) -> Result<NaiveDate, ParseError> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|source| ParseError::Date {
        text: text.to_string(),
        source,
    })
}

pub fn parse_views(text: &str) -> Result<u32, ParseError> {
    let cleaned = text.trim().replace(',', "");
    cleaned.parse().map_err(|source| ParseError::ViewCount {
        text: text.trim().to_string(),
        source,
    })
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn link_of(cell: ElementRef<'_>) -> Option<String> {
    cell.select(&ANCHOR_SEL)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}
