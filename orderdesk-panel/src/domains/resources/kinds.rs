use std::fmt::Debug;

use async_trait::async_trait;
use orderdesk_contracts::prelude::{PipelineItem, RecordLike};
use orderdesk_model::prelude::*;

use crate::infra::error::ApiResult;
use crate::infra::services::ApiService;

/// Binds a [`super::ResourceStore`] to one collection endpoint family.
#[async_trait]
pub trait ResourceKind: Send + Sync + 'static {
    type Item: RecordLike + PipelineItem + Clone + Debug + Send + Sync + 'static;

    /// Log prefix, e.g. `OrdersStore`.
    const LABEL: &'static str;
    /// Singular noun for user messages.
    const NOUN: &'static str;

    async fn fetch(
        api: &dyn ApiService,
        page: PageRequest,
    ) -> ApiResult<(Vec<Self::Item>, u64)>;

    async fn delete(api: &dyn ApiService, id: i64) -> ApiResult<MessageResponse>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Orders;

#[async_trait]
impl ResourceKind for Orders {
    type Item = Order;

    const LABEL: &'static str = "OrdersStore";
    const NOUN: &'static str = "order";

    async fn fetch(
        api: &dyn ApiService,
        page: PageRequest,
    ) -> ApiResult<(Vec<Order>, u64)> {
        let response = api.list_orders(page).await?;
        Ok((response.orders, response.total))
    }

    async fn delete(api: &dyn ApiService, id: i64) -> ApiResult<MessageResponse> {
        api.delete_order(id).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Calls;

#[async_trait]
impl ResourceKind for Calls {
    type Item = Call;

    const LABEL: &'static str = "CallsStore";
    const NOUN: &'static str = "call";

    async fn fetch(
        api: &dyn ApiService,
        page: PageRequest,
    ) -> ApiResult<(Vec<Call>, u64)> {
        let response = api.list_calls(page).await?;
        Ok((response.calls, response.total))
    }

    async fn delete(api: &dyn ApiService, id: i64) -> ApiResult<MessageResponse> {
        api.delete_call(id).await
    }
}
