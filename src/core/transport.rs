//! Platform transport abstraction.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::error::TransportError;
use super::model::{
    Account, Course, CourseListing, MembershipCard, OrderPage, ReservationRequest,
    SubmissionResponse,
};

/// Narrow interface to the booking platform.
///
/// Implementations own session handling, HTTP details and HTML parsing; the
/// engine only sees typed records and classifies whatever comes back. Every
/// call is made with the account whose credential must be presented.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use slot_sniper::core::{ReservationTransport, TransportError};
///
/// struct HttpTransport { client: MyClient }
///
/// #[async_trait]
/// impl ReservationTransport for HttpTransport {
///     async fn fetch_courses(&self, account: &Account, date: NaiveDate, shop_id: &str)
///         -> Result<CourseListing, TransportError> {
///         self.client.search(account.credential.expose(), date, shop_id).await
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait ReservationTransport: Send + Sync + 'static {
    /// Course listing for `date` at `shop_id`.
    async fn fetch_courses(
        &self,
        account: &Account,
        date: NaiveDate,
        shop_id: &str,
    ) -> Result<CourseListing, TransportError>;

    /// Membership cards held by `account`, in platform order.
    async fn fetch_cards(&self, account: &Account) -> Result<Vec<MembershipCard>, TransportError>;

    /// Order page for `course`, split into form fields, scripts and markup.
    async fn fetch_order_page(
        &self,
        account: &Account,
        course: &Course,
    ) -> Result<OrderPage, TransportError>;

    /// Submit one reservation.
    ///
    /// A single call is a single platform submission; retries are the
    /// caller's decision.
    async fn submit(
        &self,
        account: &Account,
        request: &ReservationRequest,
    ) -> Result<SubmissionResponse, TransportError>;
}
