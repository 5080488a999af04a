mod common;

use common::*;
use hawk_filter::{FilterOptions, RequestState, SignRequest};
use http::{Request, StatusCode};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;

#[test]
fn one_of_many_identical_requests_succeeds() {
    let filter = Arc::new(make_filter(FilterOptions::default()));
    let state = RequestState::new().unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let filter = filter.clone();
            let barrier = barrier.clone();
            let state = state.clone();
            thread::spawn(move || {
                let req = Request::get("http://example.com/resource")
                    .sign_hawk(&credentials(VALID_ID, VALID_KEY), &state, None, None)
                    .unwrap()
                    .body(())
                    .unwrap();
                barrier.wait();
                filter.filter(req).map(|_| ()).map_err(|resp| resp.status())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.err())
        .all(|status| status == StatusCode::UNAUTHORIZED));
}

#[test]
fn distinct_nonces_all_succeed() {
    let filter = Arc::new(make_filter(FilterOptions::default()));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let filter = filter.clone();
            thread::spawn(move || {
                let req = Request::get("http://example.com/resource")
                    .sign_hawk(
                        &credentials(VALID_ID, VALID_KEY),
                        &RequestState::new().unwrap(),
                        None,
                        None,
                    )
                    .unwrap()
                    .body(())
                    .unwrap();
                filter.filter(req).is_ok()
            })
        })
        .collect();
    assert!(handles.into_iter().all(|h| h.join().unwrap()));
}
