mod common;

use std::cell::Cell;
use std::io;

use common::{aid_csv_page, aid_rows};
use varstar::retrievers::aid::{AidFormat, AidQuery, AidRetriever};
use varstar::retrievers::{CancelFlag, CountingProgress, ObservationRetriever, RetrievalContext};

#[test]
fn test_all_pages_are_fetched() {
    let mut pages_seen = Vec::new();
    let source = |url: &str, page: u32| -> io::Result<Vec<u8>> {
        pages_seen.push((url.to_string(), page));
        Ok(match page {
            1 => aid_csv_page(Some(7), &aid_rows(1, 3)),
            2 => aid_csv_page(Some(7), &aid_rows(4, 3)),
            3 => aid_csv_page(Some(7), &aid_rows(7, 1)),
            _ => aid_csv_page(Some(7), &[]),
        })
    };

    let progress = CountingProgress::new();
    let query = AidQuery::new("000-BBC-123", "R Car").page_size(3);
    let mut retriever = AidRetriever::new(query, source);
    let result = retriever
        .retrieve(&RetrievalContext::new().with_progress(&progress))
        .unwrap();
    drop(retriever);

    assert_eq!(result.valid.len(), 7);
    assert!(!result.interrupted);
    assert_eq!(result.source_name, "R Car");
    assert_eq!(progress.total(), 7);
    assert_eq!(progress.count(), 7);

    let pages: Vec<u32> = pages_seen.iter().map(|(_, p)| *p).collect();
    assert_eq!(pages, vec![1, 2, 3]);
    assert!(pages_seen[1].0.ends_with("&page=2"));

    let records: Vec<usize> = result.valid.iter().map(|o| o.record_number).collect();
    assert_eq!(records, (1..=7).collect::<Vec<_>>());
}

#[test]
fn test_empty_page_stops_pagination() {
    let mut fetches = 0;
    let source = |_: &str, page: u32| -> io::Result<Vec<u8>> {
        fetches += 1;
        Ok(if page == 1 {
            aid_csv_page(Some(100), &aid_rows(1, 2))
        } else {
            aid_csv_page(Some(100), &[])
        })
    };
    let mut retriever = AidRetriever::new(AidQuery::new("x", "SS Cyg"), source);
    let result = retriever.retrieve(&RetrievalContext::new()).unwrap();
    drop(retriever);

    assert_eq!(fetches, 2);
    assert_eq!(result.valid.len(), 2);
}

#[test]
fn test_cancel_after_in_flight_page() {
    let cancel = CancelFlag::new();
    let fetches = Cell::new(0);
    let source = |_: &str, page: u32| -> io::Result<Vec<u8>> {
        fetches.set(fetches.get() + 1);
        Ok(aid_csv_page(Some(9), &aid_rows(3 * (page as usize - 1) + 1, 3)))
    };

    // the request comes in while the last record of page 1 is being consumed
    let consumed = Cell::new(0);
    let sink = |n: usize| {
        consumed.set(consumed.get() + n);
        if consumed.get() == 3 {
            cancel.cancel();
        }
    };

    let mut retriever = AidRetriever::new(AidQuery::new("x", "R Car").format(AidFormat::Csv), source);
    let ctx = RetrievalContext::new().with_progress(&sink).with_cancel(cancel.clone());
    let result = retriever.retrieve(&ctx).unwrap();

    assert_eq!(fetches.get(), 1);
    assert!(result.interrupted);
    assert_eq!(result.valid.len(), 3);
    assert!(result.invalid.is_empty());
}

#[test]
fn test_cancelled_before_start() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let source = |_: &str, _: u32| -> io::Result<Vec<u8>> { panic!("no page should be requested") };
    let mut retriever = AidRetriever::new(AidQuery::new("x", "R Car"), source);
    let result = retriever
        .retrieve(&RetrievalContext::new().with_cancel(cancel))
        .unwrap();
    assert!(result.interrupted);
    assert!(result.is_empty());
}
