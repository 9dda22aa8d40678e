//! # AAVSO International Database (AID) web-service retrievers
//!
//! The VSX web service serves the observations of one star as a sequence of pages,
//! either as a CSV table wrapped in XML ([`AidFormat::Csv`]) or as XML observation
//! elements ([`AidFormat::Xml`]).
//!
//! ## Transport
//! -----------------
//! No HTTP client lives in this crate. Pages are obtained through a [`PageSource`],
//! given the URL built by [`AidQuery::page_url`] and the page number. Any
//! `FnMut(&str, u32) -> io::Result<Vec<u8>>` closure is a page source.
//!
//! ## Pagination
//! -----------------
//! Page 1 is requested first. When it carries an observation count, the following
//! pages are requested in order until the count is reached or a page comes back
//! empty. Without a count the response is a single page. Cancellation is checked
//! before each page and each record; a cancelled retrieval returns what was
//! accumulated so far.
//!
//! ## Record acceptance
//! -----------------
//! Fields are extracted one by one ([`record::AidRecordBuilder`]). A record without
//! an id is rejected with an explicit message; a record lacking a JD, a magnitude or
//! a readable uncertainty, or flagged bad, is rejected with the diagnostic `Invalid`.
pub mod csv_page;
pub mod filter;
pub mod record;
pub mod xml_page;

use std::io;

use serde::{Deserialize, Serialize};

use crate::observations::JdFlavour;
use crate::retrievers::{ObservationCollector, ObservationRetriever, RetrievalContext, RetrievedObservations};
use crate::validation::InclusiveRange;
use crate::varstar_errors::ObservationReadError;

pub use csv_page::parse_csv_page;
pub use filter::ControlByteFilter;
pub use record::{AidRecordBuilder, NodeSequence, RawAidRecord};
pub use xml_page::parse_xml_page;

/// Default VSX API endpoint.
pub const VSX_API_URL_BASE: &str = "https://www.aavso.org/vsx/index.php?view=";

/// Observations requested per page.
pub const MAX_OBS_AT_ONCE: usize = 50_000;

/// Records of one page.
#[derive(Debug, Clone, Default)]
pub struct AidPage {
    /// Total number of observations announced by the service, if any.
    pub count: Option<usize>,
    pub records: Vec<RawAidRecord>,
}

/// Wire encoding of the pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AidFormat {
    Csv,
    Xml,
}

impl AidFormat {
    fn method(&self) -> &'static str {
        match self {
            AidFormat::Csv => "&csv",
            AidFormat::Xml => "&att",
        }
    }

    pub fn parse_page(&self, body: &[u8]) -> Result<AidPage, ObservationReadError> {
        match self {
            AidFormat::Csv => parse_csv_page(body),
            AidFormat::Xml => parse_xml_page(body),
        }
    }
}

/// Request parameters of an AID retrieval.
///
/// Built with chained setters:
///
/// ```rust,ignore
/// let query = AidQuery::new("000-BBC-123", "R Car")
///     .jd_range(2_450_000.0, 2_460_000.0)
///     .series("V,B")
///     .format(AidFormat::Csv);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AidQuery {
    pub base_url: String,
    pub view: String,
    /// AUID or name of the star.
    pub ident: String,
    /// Designation used as star name and source name.
    pub designation: String,
    pub min_jd: Option<f64>,
    pub max_jd: Option<f64>,
    pub series: Option<String>,
    pub obs_codes: Option<String>,
    pub min_fields: bool,
    pub page_size: usize,
    pub format: AidFormat,
    pub uncertainty_range: InclusiveRange,
}

impl AidQuery {
    pub fn new(ident: &str, designation: &str) -> Self {
        AidQuery {
            base_url: VSX_API_URL_BASE.to_string(),
            view: "api.object".to_string(),
            ident: ident.to_string(),
            designation: designation.to_string(),
            min_jd: None,
            max_jd: None,
            series: None,
            obs_codes: None,
            min_fields: false,
            page_size: MAX_OBS_AT_ONCE,
            format: AidFormat::Csv,
            uncertainty_range: InclusiveRange::new(0.0, f64::MAX),
        }
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn jd_range(mut self, min_jd: f64, max_jd: f64) -> Self {
        self.min_jd = Some(min_jd);
        self.max_jd = Some(max_jd);
        self
    }

    /// Comma separated band short names.
    pub fn series(mut self, series: &str) -> Self {
        self.series = Some(series.to_string());
        self
    }

    /// Comma separated observer codes.
    pub fn obs_codes(mut self, codes: &str) -> Self {
        self.obs_codes = Some(codes.to_string());
        self
    }

    pub fn min_fields(mut self, yes: bool) -> Self {
        self.min_fields = yes;
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    pub fn format(mut self, format: AidFormat) -> Self {
        self.format = format;
        self
    }

    pub fn uncertainty_range(mut self, range: InclusiveRange) -> Self {
        self.uncertainty_range = range;
        self
    }

    /// URL of the first page (without page parameter).
    pub fn url(&self) -> String {
        let mut url = format!(
            "{}{}&ident={}&data={}",
            self.base_url, self.view, self.ident, self.page_size
        );
        if let (Some(min), Some(max)) = (self.min_jd, self.max_jd) {
            url.push_str(&format!("&fromjd={min}&tojd={max}"));
        }
        url.push_str(self.format.method());
        if let Some(series) = &self.series {
            url.push_str(&format!("&band={series}"));
        }
        if let Some(codes) = &self.obs_codes {
            url.push_str(&format!("&obscode={codes}"));
        }
        if self.min_fields {
            url.push_str("&minfields");
        }
        url.push_str("&mtype=std");
        url
    }

    pub fn page_url(&self, page: u32) -> String {
        format!("{}&page={page}", self.url())
    }
}

/// Supplier of page bodies.
pub trait PageSource {
    fn fetch_page(&mut self, url: &str, page: u32) -> io::Result<Vec<u8>>;
}

impl<F> PageSource for F
where
    F: FnMut(&str, u32) -> io::Result<Vec<u8>>,
{
    fn fetch_page(&mut self, url: &str, page: u32) -> io::Result<Vec<u8>> {
        self(url, page)
    }
}

/// Paginated AID retriever.
pub struct AidRetriever<S> {
    query: AidQuery,
    source: S,
}

impl<S: PageSource> AidRetriever<S> {
    pub fn new(query: AidQuery, source: S) -> Self {
        AidRetriever { query, source }
    }

    pub fn query(&self) -> &AidQuery {
        &self.query
    }
}

impl<S: PageSource> ObservationRetriever for AidRetriever<S> {
    fn retrieve(&mut self, ctx: &RetrievalContext<'_>) -> Result<RetrievedObservations, ObservationReadError> {
        let mut collector = ObservationCollector::for_source("AID");
        let mut page_number: u32 = 1;
        let mut position = 0usize;
        let mut interrupted = false;

        'pages: loop {
            if ctx.was_cancelled() {
                interrupted = true;
                break;
            }

            let url = self.query.page_url(page_number);
            let body = self.source.fetch_page(&url, page_number).map_err(|e| {
                ObservationReadError::Other(format!(
                    "Unable to obtain information for {}: {e}",
                    self.query.designation
                ))
            })?;
            let page = self.query.format.parse_page(&body)?;
            log::debug!(
                "{}: page {page_number} holds {} record(s), count {:?}",
                self.query.designation,
                page.records.len(),
                page.count
            );
            if page_number == 1 {
                if let Some(count) = page.count {
                    ctx.set_total(count);
                }
            }

            let page_len = page.records.len();
            for record in page.records {
                if ctx.was_cancelled() {
                    interrupted = true;
                    break 'pages;
                }
                position += 1;
                collector.add(record.into_record(position, &self.query.designation, self.query.uncertainty_range));
                ctx.increment_progress(1);
            }

            match page.count {
                Some(count) if page_len > 0 && position < count => page_number += 1,
                _ => break,
            }
        }
        ctx.finish();

        if !interrupted {
            collector.ensure_any_valid()?;
        }
        Ok(collector.finish(JdFlavour::Jd, self.source_name(), self.source_type(), interrupted))
    }

    fn source_name(&self) -> String {
        self.query.designation.clone()
    }

    fn source_type(&self) -> String {
        "AAVSO International Database".to_string()
    }
}

#[cfg(test)]
mod aid_test {
    use super::*;

    #[test]
    fn test_query_url() {
        let query = AidQuery::new("000-BBC-123", "R Car")
            .base_url("https://example.org/api?view=")
            .jd_range(2_450_000.0, 2_450_100.5)
            .series("V")
            .page_size(10);
        assert_eq!(
            query.page_url(2),
            "https://example.org/api?view=api.object&ident=000-BBC-123&data=10&fromjd=2450000&tojd=2450100.5&csv&band=V&mtype=std&page=2"
        );
        let xml = query.format(AidFormat::Xml).min_fields(true);
        assert!(xml.url().contains("&att&band=V&minfields&mtype=std"));
    }

    #[test]
    fn test_single_page_without_count() {
        let body = b"<Root><Data><![CDATA[obsID,JD,mag,uncert,band,val\n1,2450000.5,9.5,0.01,V,Z\n2,2450001.5,9.7,,V,T\n3,2450002.5,9.9,0.01,V,X\n]]></Data></Root>".to_vec();
        let mut calls = 0;
        let source = |_: &str, _: u32| -> io::Result<Vec<u8>> {
            calls += 1;
            Ok(body.clone())
        };
        let mut retriever = AidRetriever::new(AidQuery::new("x", "R Car"), source);
        let result = retriever.retrieve(&RetrievalContext::new()).unwrap();
        drop(retriever);
        assert_eq!(calls, 1);
        assert_eq!(result.valid.len(), 2);
        assert_eq!(result.invalid.len(), 1);
        assert!(result.valid[1].is_discrepant());
        assert_eq!(result.invalid[0].error, "Invalid");
        assert_eq!(result.source_name, "R Car");
    }

    #[test]
    fn test_transport_error_is_read_error() {
        let source = |_: &str, _: u32| -> io::Result<Vec<u8>> { Err(io::Error::other("offline")) };
        let mut retriever = AidRetriever::new(AidQuery::new("x", "R Car"), source);
        let err = retriever.retrieve(&RetrievalContext::new()).unwrap_err();
        assert!(err.to_string().contains("offline"));
    }
}
