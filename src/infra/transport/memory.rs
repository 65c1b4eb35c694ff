//! In-memory transport replaying scripted platform responses.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::core::{
    Account, Course, CourseListing, MembershipCard, OrderPage, ReservationRequest,
    ReservationTransport, SubmissionResponse, TransportError,
};

/// A submission as the transport received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    /// Account name.
    pub account: String,
    /// Request payload.
    pub request: ReservationRequest,
}

/// Transport backed by canned responses, for tests and dry runs.
///
/// Listings are keyed by date, cards by account name (with a shared fallback),
/// order pages by course id (with a shared fallback). Submission responses are
/// consumed in FIFO order across all accounts; once the script runs dry every
/// further submission fails with [`TransportError::Other`].
#[derive(Default)]
pub struct ScriptedTransport {
    listings: HashMap<NaiveDate, Result<CourseListing, TransportError>>,
    cards: HashMap<String, Result<Vec<MembershipCard>, TransportError>>,
    default_cards: Option<Result<Vec<MembershipCard>, TransportError>>,
    order_pages: HashMap<String, Result<OrderPage, TransportError>>,
    default_order_page: Option<OrderPage>,
    responses: Mutex<VecDeque<Result<SubmissionResponse, TransportError>>>,
    submitted: Mutex<Vec<RecordedSubmission>>,
    listing_calls: AtomicUsize,
    card_calls: AtomicUsize,
    order_calls: AtomicUsize,
}

impl ScriptedTransport {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Listing returned for `date`.
    pub fn with_listing(mut self, date: NaiveDate, listing: CourseListing) -> Self {
        self.listings.insert(date, Ok(listing));
        self
    }

    /// Listing fetch for `date` fails with `error`.
    pub fn with_listing_error(mut self, date: NaiveDate, error: TransportError) -> Self {
        self.listings.insert(date, Err(error));
        self
    }

    /// Cards for every account without a specific entry.
    pub fn with_cards(mut self, cards: Vec<MembershipCard>) -> Self {
        self.default_cards = Some(Ok(cards));
        self
    }

    /// Cards for one account.
    pub fn with_account_cards(
        mut self,
        account: impl Into<String>,
        cards: Result<Vec<MembershipCard>, TransportError>,
    ) -> Self {
        self.cards.insert(account.into(), cards);
        self
    }

    /// Order page for a specific course id.
    pub fn with_order_page(
        mut self,
        course_id: impl Into<String>,
        page: Result<OrderPage, TransportError>,
    ) -> Self {
        self.order_pages.insert(course_id.into(), page);
        self
    }

    /// Order page for any course without a specific entry.
    pub fn with_default_order_page(mut self, page: OrderPage) -> Self {
        self.default_order_page = Some(page);
        self
    }

    /// Append one submission response to the script.
    pub fn push_response(&self, response: Result<SubmissionResponse, TransportError>) {
        self.responses.lock().push_back(response);
    }

    /// Append a response, builder style.
    pub fn with_response(self, response: Result<SubmissionResponse, TransportError>) -> Self {
        self.push_response(response);
        self
    }

    /// Submissions received so far, in order.
    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submitted.lock().clone()
    }

    /// Number of listing fetches.
    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    /// Number of card fetches.
    pub fn card_calls(&self) -> usize {
        self.card_calls.load(Ordering::SeqCst)
    }

    /// Number of order-page fetches.
    pub fn order_calls(&self) -> usize {
        self.order_calls.load(Ordering::SeqCst)
    }

    /// Total transport calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.listing_calls() + self.card_calls() + self.order_calls() + self.submitted.lock().len()
    }
}

#[async_trait]
impl ReservationTransport for ScriptedTransport {
    async fn fetch_courses(
        &self,
        _account: &Account,
        date: NaiveDate,
        _shop_id: &str,
    ) -> Result<CourseListing, TransportError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        self.listings
            .get(&date)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::Other(format!("no listing scripted for {date}"))))
    }

    async fn fetch_cards(&self, account: &Account) -> Result<Vec<MembershipCard>, TransportError> {
        self.card_calls.fetch_add(1, Ordering::SeqCst);
        self.cards
            .get(&account.name)
            .or(self.default_cards.as_ref())
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_order_page(
        &self,
        _account: &Account,
        course: &Course,
    ) -> Result<OrderPage, TransportError> {
        self.order_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(page) = self.order_pages.get(&course.id) {
            return page.clone();
        }
        self.default_order_page.clone().ok_or_else(|| {
            TransportError::Other(format!("no order page scripted for course {}", course.id))
        })
    }

    async fn submit(
        &self,
        account: &Account,
        request: &ReservationRequest,
    ) -> Result<SubmissionResponse, TransportError> {
        self.submitted.lock().push(RecordedSubmission {
            account: account.name.clone(),
            request: request.clone(),
        });
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("submission script exhausted".into())))
    }
}
