use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use orderdesk_contracts::prelude::PipelineCounts;
use orderdesk_model::{ListPage, PageRequest};
use parking_lot::Mutex;

use super::kinds::ResourceKind;
use crate::common::OpStatus;
use crate::domains::notifications::NotificationBus;
use crate::infra::credential::{CredentialContext, CredentialEpoch};
use crate::infra::error::{ApiError, ApiResult};
use crate::infra::services::ApiService;

/// What happened to a fetch once its response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response replaced the visible page.
    Applied,
    /// The cursor or credential moved on while the request was in flight.
    Stale,
}

/// What a renderer should show for the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Loading,
    Empty,
    Ready,
    Error(String),
}

#[derive(Debug, Clone)]
pub struct ResourceSnapshot<T> {
    pub page: ListPage<T>,
    pub cursor: u32,
    /// Tallies over the loaded page only.
    pub counters: PipelineCounts,
    pub status: OpStatus,
    pub last_error: Option<String>,
}

impl<T> ResourceSnapshot<T> {
    pub fn view_state(&self) -> ViewState {
        match self.status {
            OpStatus::Idle => ViewState::Idle,
            OpStatus::Loading => ViewState::Loading,
            OpStatus::Error => ViewState::Error(
                self.last_error.clone().unwrap_or_default(),
            ),
            OpStatus::Success if self.page.is_empty() => ViewState::Empty,
            OpStatus::Success => ViewState::Ready,
        }
    }
}

#[derive(Debug)]
struct StoreState<T> {
    page: ListPage<T>,
    cursor: u32,
    counters: PipelineCounts,
    status: OpStatus,
    last_error: Option<String>,
    in_flight: usize,
    /// Bumped by every fetch; only the newest one may apply.
    generation: u64,
}

struct StoreInner<K: ResourceKind> {
    api: Arc<dyn ApiService>,
    credentials: CredentialContext,
    notifications: NotificationBus,
    page_size: u32,
    state: Mutex<StoreState<K::Item>>,
    deleting: AtomicBool,
}

/// One page of a server-backed collection plus its pagination cursor.
///
/// The cursor is the page the user last asked for. A response is applied
/// only if it answers the most recently issued fetch and the credential has
/// not changed. Late responses are dropped whatever order they complete in,
/// including an older request for the page now under the cursor.
pub struct ResourceStore<K: ResourceKind> {
    inner: Arc<StoreInner<K>>,
}

impl<K: ResourceKind> Clone for ResourceStore<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: ResourceKind> std::fmt::Debug for ResourceStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct(K::LABEL)
            .field("cursor", &state.cursor)
            .field("total", &state.page.total)
            .field("items", &state.page.items.len())
            .field("status", &state.status)
            .finish()
    }
}

impl<K: ResourceKind> ResourceStore<K> {
    /// `page_size` is clamped to the server's accepted range.
    pub fn new(
        api: Arc<dyn ApiService>,
        credentials: CredentialContext,
        notifications: NotificationBus,
        page_size: u32,
    ) -> Self {
        let page_size = page_size.clamp(1, orderdesk_model::MAX_PAGE_SIZE);
        Self {
            inner: Arc::new(StoreInner {
                api,
                credentials,
                notifications,
                page_size,
                state: Mutex::new(StoreState {
                    page: ListPage::empty(page_size),
                    cursor: 0,
                    counters: PipelineCounts::default(),
                    status: OpStatus::Idle,
                    last_error: None,
                    in_flight: 0,
                    generation: 0,
                }),
                deleting: AtomicBool::new(false),
            }),
        }
    }

    pub fn snapshot(&self) -> ResourceSnapshot<K::Item> {
        let state = self.inner.state.lock();
        ResourceSnapshot {
            page: state.page.clone(),
            cursor: state.cursor,
            counters: state.counters,
            status: state.status,
            last_error: state.last_error.clone(),
        }
    }

    pub fn cursor(&self) -> u32 {
        self.inner.state.lock().cursor
    }

    pub fn status(&self) -> OpStatus {
        self.inner.state.lock().status
    }

    pub fn page_size(&self) -> u32 {
        self.inner.page_size
    }

    /// Move the cursor to `index` and load that page.
    pub async fn go_to_page(&self, index: u32) -> ApiResult<FetchOutcome> {
        self.fetch_page(index).await
    }

    /// Reload the page under the cursor.
    pub async fn refresh(&self) -> ApiResult<FetchOutcome> {
        let cursor = self.cursor();
        self.fetch_page(cursor).await
    }

    /// Forget the loaded page and move the cursor back to 0.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.page = ListPage::empty(self.inner.page_size);
        state.cursor = 0;
        state.counters = PipelineCounts::default();
        state.last_error = None;
        state.status = OpStatus::Idle;
        state.generation += 1;
    }

    /// Forget the loaded page and load page 0. Used after a credential
    /// change.
    pub async fn reset(&self) -> ApiResult<FetchOutcome> {
        self.clear();
        self.fetch_page(0).await
    }

    /// Load page `index` and make it the cursor.
    ///
    /// On failure the visible items are cleared, the total is kept and one
    /// error notification is pushed.
    pub async fn fetch_page(&self, index: u32) -> ApiResult<FetchOutcome> {
        let (_, epoch) = match self.inner.credentials.require() {
            Ok(found) => found,
            Err(err) => {
                self.fail(&err);
                return Err(err);
            }
        };

        let mut index = index;
        // One extra round trip at most: when the requested page lies past
        // the end (e.g. after deleting the last row of the last page), step
        // back to the last page that exists.
        for _ in 0..2 {
            let request = PageRequest::new(index, self.inner.page_size)?;
            let generation = self.begin(index);

            let result = K::fetch(self.inner.api.as_ref(), request).await;

            match self.complete(request, generation, epoch, result) {
                Completion::Applied { clamp_to: Some(last) } => {
                    debug!(
                        "[{}] Page {} is past the end, loading page {}",
                        K::LABEL,
                        index,
                        last
                    );
                    index = last;
                }
                Completion::Applied { clamp_to: None } => {
                    return Ok(FetchOutcome::Applied);
                }
                Completion::Stale => return Ok(FetchOutcome::Stale),
                Completion::Failed(err) => return Err(err),
            }
        }
        Ok(FetchOutcome::Applied)
    }

    fn begin(&self, index: u32) -> u64 {
        let mut state = self.inner.state.lock();
        state.cursor = index;
        state.in_flight += 1;
        state.status = OpStatus::Loading;
        state.generation += 1;
        state.generation
    }

    fn complete(
        &self,
        request: PageRequest,
        generation: u64,
        epoch: CredentialEpoch,
        result: ApiResult<(Vec<K::Item>, u64)>,
    ) -> Completion {
        let mut state = self.inner.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);

        let stale = state.generation != generation
            || !self.inner.credentials.is_current(epoch);
        if stale {
            debug!(
                "[{}] Dropping stale response for page {} \
                 (cursor {}, fetch {} of {})",
                K::LABEL,
                request.index(),
                state.cursor,
                generation,
                state.generation
            );
            if state.in_flight == 0 && state.status == OpStatus::Loading {
                // Nobody else will settle the flag.
                state.status = if state.last_error.is_some() {
                    OpStatus::Error
                } else {
                    OpStatus::Success
                };
            }
            return Completion::Stale;
        }

        match result {
            Ok((items, total)) => {
                let page = ListPage::from_response(request, items, total);
                let clamp_to = (page.is_empty()
                    && page.total > 0
                    && request.index() >= page.page_count())
                .then(|| page.page_count() - 1);

                state.counters = PipelineCounts::tally(&page.items);
                state.page = page;
                state.last_error = None;
                if state.in_flight == 0 {
                    state.status = OpStatus::Success;
                }
                info!(
                    "[{}] Loaded page {} ({} of {} items)",
                    K::LABEL,
                    request.index(),
                    state.page.items.len(),
                    state.page.total
                );
                Completion::Applied { clamp_to }
            }
            Err(err) => {
                warn!(
                    "[{}] Failed to load page {}: {}",
                    K::LABEL,
                    request.index(),
                    err
                );
                state.page.items.clear();
                state.page.index = request.index();
                state.counters = PipelineCounts::default();
                state.status = OpStatus::Error;
                state.last_error = Some(err.to_string());
                drop(state);
                self.inner.notifications.error(format!(
                    "Failed to load {}s: {}",
                    K::NOUN,
                    err
                ));
                Completion::Failed(err)
            }
        }
    }

    fn fail(&self, err: &ApiError) {
        {
            let mut state = self.inner.state.lock();
            state.status = OpStatus::Error;
            state.last_error = Some(err.to_string());
        }
        self.inner.notifications.error(err.to_string());
    }

    /// Delete one record, then reload the page the user is looking at.
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        if let Err(err) = self.inner.credentials.require() {
            self.inner.notifications.error(err.to_string());
            return Err(err);
        }
        if self.inner.deleting.swap(true, Ordering::AcqRel) {
            let err = ApiError::Busy {
                component: K::LABEL,
            };
            self.inner.notifications.error(err.to_string());
            return Err(err);
        }

        let result = K::delete(self.inner.api.as_ref(), id).await;
        self.inner.deleting.store(false, Ordering::Release);

        match result {
            Ok(response) => {
                info!("[{}] Deleted {} {}", K::LABEL, K::NOUN, id);
                self.inner.notifications.success(response.message);
                if let Err(err) = self.refresh().await {
                    debug!(
                        "[{}] Reload after delete failed: {}",
                        K::LABEL,
                        err
                    );
                }
                Ok(())
            }
            Err(err) => {
                warn!("[{}] Failed to delete {}: {}", K::LABEL, id, err);
                self.inner
                    .notifications
                    .error(format!("Failed to delete {}: {}", K::NOUN, err));
                Err(err)
            }
        }
    }
}

enum Completion {
    Applied { clamp_to: Option<u32> },
    Stale,
    Failed(ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::notifications::ToastKind;
    use crate::domains::resources::{Calls, Orders};
    use crate::infra::testing::{ApiCall, Endpoint, TestApiService};
    use chrono::Utc;
    use orderdesk_model::prelude::{
        Call, CallListResponse, CallState, CallStatus, Order,
        OrderListResponse, OrderStatus,
    };
    use std::time::Duration;

    fn order(id: i64, status: OrderStatus) -> Order {
        Order {
            id,
            order_id: format!("ORD-{id}"),
            status,
            belnr: Some(format!("{}", 1000 + id)),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn orders(ids: &[i64], total: u64) -> OrderListResponse {
        OrderListResponse {
            orders: ids
                .iter()
                .map(|id| order(*id, OrderStatus::Scraped))
                .collect(),
            total,
        }
    }

    fn setup(
        key: Option<&str>,
    ) -> (TestApiService, ResourceStore<Orders>, NotificationBus) {
        let api = TestApiService::new();
        let bus = NotificationBus::new(Duration::from_secs(4));
        let store = ResourceStore::<Orders>::new(
            Arc::new(api.clone()),
            CredentialContext::new(key),
            bus.clone(),
            2,
        );
        (api, store, bus)
    }

    #[tokio::test]
    async fn no_request_without_credential() {
        let (api, store, bus) = setup(None);
        let err = store.fetch_page(0).await.unwrap_err();
        assert_eq!(err, ApiError::MissingCredential);
        assert!(api.calls().is_empty());
        assert_eq!(bus.snapshot()[0].kind, ToastKind::Error);
    }

    #[tokio::test]
    async fn fetch_sends_skip_and_limit_and_tallies_counters() {
        let (api, store, _) = setup(Some("key"));
        api.enqueue(
            Endpoint::ListOrders,
            &OrderListResponse {
                orders: vec![
                    order(5, OrderStatus::Scraped),
                    order(6, OrderStatus::Converted),
                ],
                total: 9,
            },
        );

        assert_eq!(store.fetch_page(2).await.unwrap(), FetchOutcome::Applied);

        assert_eq!(
            api.calls(),
            vec![ApiCall::ListOrders { skip: 4, limit: 2 }]
        );
        let snapshot = store.snapshot();
        assert_eq!(snapshot.cursor, 2);
        assert_eq!(snapshot.page.total, 9);
        assert_eq!(snapshot.counters.awaiting_conversion, 1);
        assert_eq!(snapshot.counters.awaiting_upload, 1);
        assert_eq!(snapshot.view_state(), ViewState::Ready);
    }

    #[tokio::test]
    async fn repeated_fetches_show_equal_pages() {
        let (api, store, _) = setup(Some("key"));
        api.enqueue(Endpoint::ListOrders, &orders(&[1, 2], 3));
        api.enqueue(Endpoint::ListOrders, &orders(&[1, 2], 3));

        store.fetch_page(0).await.unwrap();
        let first = store.snapshot().page;
        store.fetch_page(0).await.unwrap();
        assert_eq!(store.snapshot().page, first);
    }

    #[tokio::test]
    async fn late_response_for_an_old_cursor_is_dropped() {
        let (api, store, _) = setup(Some("key"));
        let gate = api.enqueue_gated(Endpoint::ListOrders, &orders(&[1, 2], 4));
        api.enqueue(Endpoint::ListOrders, &orders(&[3, 4], 4));

        let slow = tokio::spawn({
            let store = store.clone();
            async move { store.fetch_page(0).await }
        });
        // Let the page 0 request reach the gate.
        tokio::task::yield_now().await;
        while api.count(Endpoint::ListOrders) == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(store.go_to_page(1).await.unwrap(), FetchOutcome::Applied);
        gate.release();
        assert_eq!(slow.await.unwrap().unwrap(), FetchOutcome::Stale);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.cursor, 1);
        let ids: Vec<i64> = snapshot.page.items.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(snapshot.status, OpStatus::Success);
    }

    #[tokio::test]
    async fn older_fetch_for_the_same_page_never_overwrites_a_newer_one() {
        let (api, store, _) = setup(Some("key"));
        let gate = api.enqueue_gated(Endpoint::ListOrders, &orders(&[1, 2], 4));
        api.enqueue(Endpoint::ListOrders, &orders(&[3, 4], 4));
        api.enqueue(Endpoint::ListOrders, &orders(&[7, 8], 4));

        let slow = tokio::spawn({
            let store = store.clone();
            async move { store.fetch_page(0).await }
        });
        while api.count(Endpoint::ListOrders) == 0 {
            tokio::task::yield_now().await;
        }

        store.go_to_page(1).await.unwrap();
        assert_eq!(store.go_to_page(0).await.unwrap(), FetchOutcome::Applied);
        gate.release();
        assert_eq!(slow.await.unwrap().unwrap(), FetchOutcome::Stale);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.cursor, 0);
        let ids: Vec<i64> = snapshot.page.items.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![7, 8]);
        assert_eq!(snapshot.status, OpStatus::Success);
    }

    #[tokio::test]
    async fn response_under_a_replaced_credential_is_dropped() {
        let api = TestApiService::new();
        let credentials = CredentialContext::new(Some("old"));
        let store = ResourceStore::<Orders>::new(
            Arc::new(api.clone()),
            credentials.clone(),
            NotificationBus::new(Duration::from_secs(4)),
            10,
        );
        let gate = api.enqueue_gated(Endpoint::ListOrders, &orders(&[1], 1));

        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.fetch_page(0).await }
        });
        while api.count(Endpoint::ListOrders) == 0 {
            tokio::task::yield_now().await;
        }
        credentials.set("new");
        gate.release();

        assert_eq!(pending.await.unwrap().unwrap(), FetchOutcome::Stale);
        assert!(store.snapshot().page.is_empty());
    }

    #[tokio::test]
    async fn failure_clears_items_but_keeps_total() {
        let (api, store, bus) = setup(Some("key"));
        api.enqueue(Endpoint::ListOrders, &orders(&[1, 2], 7));
        api.enqueue_error(
            Endpoint::ListOrders,
            ApiError::Network("connection reset".into()),
        );

        store.fetch_page(0).await.unwrap();
        assert!(store.fetch_page(0).await.is_err());

        let snapshot = store.snapshot();
        assert!(snapshot.page.items.is_empty());
        assert_eq!(snapshot.page.total, 7);
        assert_eq!(snapshot.status, OpStatus::Error);
        let toasts = bus.snapshot();
        assert_eq!(toasts.len(), 1);
        assert!(toasts[0].message.contains("connection reset"));
    }

    #[tokio::test]
    async fn empty_collection_is_an_empty_state_not_an_error() {
        let (_, store, bus) = setup(Some("key"));
        store.fetch_page(0).await.unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.page.total, 0);
        assert_eq!(snapshot.view_state(), ViewState::Empty);
        assert!(bus.snapshot().is_empty());
    }

    #[tokio::test]
    async fn delete_reloads_the_current_page() {
        let (api, store, bus) = setup(Some("key"));
        api.enqueue(Endpoint::ListOrders, &orders(&[3, 4], 6));
        api.enqueue_json(
            Endpoint::DeleteOrder,
            serde_json::json!({"message": "Order 4 deleted."}),
        );
        api.enqueue(Endpoint::ListOrders, &orders(&[3, 5], 5));

        store.go_to_page(1).await.unwrap();
        store.delete(4).await.unwrap();

        assert_eq!(
            api.calls(),
            vec![
                ApiCall::ListOrders { skip: 2, limit: 2 },
                ApiCall::DeleteOrder(4),
                ApiCall::ListOrders { skip: 2, limit: 2 },
            ]
        );
        assert_eq!(store.cursor(), 1);
        assert_eq!(bus.snapshot()[0].message, "Order 4 deleted.");
    }

    #[tokio::test]
    async fn deleting_the_last_row_steps_back_a_page() {
        let (api, store, _) = setup(Some("key"));
        api.enqueue(Endpoint::ListOrders, &orders(&[5], 5));
        api.enqueue(Endpoint::ListOrders, &orders(&[], 4));
        api.enqueue(Endpoint::ListOrders, &orders(&[3, 4], 4));

        store.go_to_page(2).await.unwrap();
        store.delete(5).await.unwrap();

        assert_eq!(store.cursor(), 1);
        assert_eq!(store.snapshot().page.items.len(), 2);
        assert_eq!(
            api.calls_to(Endpoint::ListOrders).last(),
            Some(&ApiCall::ListOrders { skip: 2, limit: 2 })
        );
    }

    #[tokio::test]
    async fn failed_delete_does_not_refetch() {
        let (api, store, bus) = setup(Some("key"));
        api.enqueue_error(
            Endpoint::DeleteOrder,
            ApiError::Server {
                status: 404,
                detail: "Order with id 9 not found.".into(),
            },
        );

        assert!(store.delete(9).await.is_err());
        assert_eq!(api.count(Endpoint::ListOrders), 0);
        assert!(bus.snapshot()[0].message.contains("not found"));
    }

    #[tokio::test]
    async fn calls_store_uses_the_calls_endpoints() {
        let api = TestApiService::new();
        let store = ResourceStore::<Calls>::new(
            Arc::new(api.clone()),
            CredentialContext::new(Some("key")),
            NotificationBus::new(Duration::from_secs(4)),
            10,
        );
        api.enqueue(
            Endpoint::ListCalls,
            &CallListResponse {
                calls: vec![Call {
                    id: 1,
                    call_id: "c-1".into(),
                    state: CallState::Ended,
                    from_number: "0203 1".into(),
                    to_number: "0203 2".into(),
                    extension: None,
                    caller_name: Some("Jordan".into()),
                    call_timestamp: Utc::now(),
                    status: CallStatus::Received,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                }],
                total: 1,
            },
        );

        store.fetch_page(0).await.unwrap();
        assert_eq!(store.snapshot().counters.awaiting_conversion, 1);
        store.delete(1).await.unwrap();
        assert_eq!(api.count(Endpoint::DeleteCall), 1);
        assert_eq!(api.count(Endpoint::ListCalls), 2);
    }
}
