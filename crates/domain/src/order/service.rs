//! Order service orchestrating validation, name resolution, evidence
//! upload, and transactional persistence.

use std::time::Instant;

use common::{Money, OrderId, OrderStatus};
use store::{NewOrder, NewOrderItem, OrderRecord, OrderStore, StoreError};

use crate::error::DomainError;
use crate::storage::ObjectStorage;

use super::number::generate_order_number;
use super::request::{CreateOrderRequest, OrderItemRequest, PlacedOrder};
use super::OrderError;

/// Folder under which payment evidence is stored.
const PAYMENT_EVIDENCE_FOLDER: &str = "payment-evidence";

/// How often a fresh order number is generated before a conflict is
/// surfaced to the caller.
const MAX_ORDER_NUMBER_ATTEMPTS: u32 = 3;

/// Service for placing and administering orders.
///
/// Placement is strict and all-or-nothing: validation happens before any
/// side effect, the evidence upload happens before the transaction, and
/// header, items, and stock decrements commit together or not at all.
pub struct OrderService<S, B> {
    store: S,
    storage: B,
}

impl<S: OrderStore, B: ObjectStorage> OrderService<S, B> {
    /// Creates a new order service over the given store and object
    /// storage.
    pub fn new(store: S, storage: B) -> Self {
        Self { store, storage }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order: the single public entry point of the purchase
    /// workflow.
    #[tracing::instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn place_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<PlacedOrder, DomainError> {
        let started = Instant::now();

        validate_request(&request)?;

        let items = self.resolve_items(&request.items).await?;

        let payment_evidence_url = match request.payment_evidence {
            Some(bytes) => Some(
                self.storage
                    .upload(bytes, PAYMENT_EVIDENCE_FOLDER)
                    .await?
                    .url,
            ),
            None => None,
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            let order = NewOrder {
                order_number: generate_order_number(),
                customer_id: request.customer_id,
                customer_name: request.customer_name.clone(),
                customer_email: request.customer_email.clone(),
                customer_phone: request.customer_phone.clone(),
                delivery_address: request.delivery_address.clone(),
                total_amount: request.total_amount,
                payment_evidence_url: payment_evidence_url.clone(),
                admin_note: None,
            };

            match self.store.create_order(order, items.clone()).await {
                Ok(created) => {
                    metrics::counter!("orders_created_total").increment(1);
                    metrics::histogram!("order_create_duration_seconds")
                        .record(started.elapsed().as_secs_f64());
                    tracing::info!(
                        order_id = %created.id,
                        order_number = %created.order_number,
                        "order placed"
                    );
                    return Ok(PlacedOrder {
                        id: created.id,
                        order_number: created.order_number,
                        status: OrderStatus::Pending,
                    });
                }
                Err(StoreError::OrderNumberConflict { order_number })
                    if attempts < MAX_ORDER_NUMBER_ATTEMPTS =>
                {
                    tracing::warn!(%order_number, attempts, "order number taken, regenerating");
                }
                Err(e) => {
                    metrics::counter!("orders_rejected_total").increment(1);
                    return Err(e.into());
                }
            }
        }
    }

    /// Loads an order by ID. Returns `None` if it does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>, DomainError> {
        Ok(self.store.get_order(id).await?)
    }

    /// Lists all orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<OrderRecord>, DomainError> {
        Ok(self.store.list_orders().await?)
    }

    /// Moves an order to a new status, validating the transition against
    /// the order state machine.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<OrderRecord, DomainError> {
        let mut order = self
            .store
            .get_order(id)
            .await?
            .ok_or(StoreError::OrderNotFound(id))?;

        if !order.status.can_transition_to(next) {
            return Err(OrderError::InvalidStateTransition {
                from: order.status,
                to: next,
            }
            .into());
        }

        self.store.update_status(id, next).await?;
        order.status = next;
        Ok(order)
    }

    /// Resolves a snapshot name for every item.
    ///
    /// Fallback chain: supplied name, then the live product name, then
    /// `Product #<id>`, then `Unknown Product` when no id was supplied.
    async fn resolve_items(
        &self,
        items: &[OrderItemRequest],
    ) -> Result<Vec<NewOrderItem>, DomainError> {
        let mut resolved = Vec::with_capacity(items.len());
        for item in items {
            let product_name = match item
                .product_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
            {
                Some(name) => name.to_string(),
                None => match item.product_id {
                    Some(product_id) => match self.store.product_name(product_id).await? {
                        Some(name) => name,
                        None => format!("Product #{product_id}"),
                    },
                    None => "Unknown Product".to_string(),
                },
            };

            resolved.push(NewOrderItem {
                product_id: item.product_id,
                product_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: item.subtotal,
            });
        }
        Ok(resolved)
    }
}

/// Fail-fast request validation; nothing is persisted when this fails.
fn validate_request(request: &CreateOrderRequest) -> Result<(), OrderError> {
    let required: [(&'static str, &str); 4] = [
        ("customer_name", &request.customer_name),
        ("customer_email", &request.customer_email),
        ("customer_phone", &request.customer_phone),
        ("delivery_address", &request.delivery_address),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(OrderError::MissingField { field });
        }
    }

    if request.items.is_empty() {
        return Err(OrderError::NoItems);
    }

    let mut sum = Money::zero();
    for (line, item) in request.items.iter().enumerate() {
        if item.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                line,
                quantity: item.quantity,
            });
        }

        let expected = item
            .unit_price
            .checked_multiply(item.quantity)
            .ok_or(OrderError::AmountOverflow { line })?;
        if item.subtotal != expected {
            return Err(OrderError::SubtotalMismatch {
                line,
                expected,
                actual: item.subtotal,
            });
        }
        sum = sum
            .checked_add(item.subtotal)
            .ok_or(OrderError::AmountOverflow { line })?;
    }

    if request.total_amount != sum {
        return Err(OrderError::TotalMismatch {
            expected: sum,
            actual: request.total_amount,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;
    use store::{InMemoryOrderStore, NewProduct};

    use crate::storage::InMemoryObjectStorage;

    fn service() -> OrderService<InMemoryOrderStore, InMemoryObjectStorage> {
        OrderService::new(InMemoryOrderStore::new(), InMemoryObjectStorage::new())
    }

    async fn seed_product(
        service: &OrderService<InMemoryOrderStore, InMemoryObjectStorage>,
        name: &str,
        price_cents: i64,
        stock: i32,
    ) -> ProductId {
        service
            .store()
            .insert_product(NewProduct {
                name: name.to_string(),
                price: Money::from_cents(price_cents),
                stock,
            })
            .await
            .unwrap()
    }

    fn item(product_id: Option<ProductId>, quantity: u32, price_cents: i64) -> OrderItemRequest {
        OrderItemRequest {
            product_id,
            product_name: None,
            quantity,
            unit_price: Money::from_cents(price_cents),
            subtotal: Money::from_cents(price_cents).multiply(quantity),
        }
    }

    fn request(items: Vec<OrderItemRequest>) -> CreateOrderRequest {
        let total: Money = items.iter().map(|i| i.subtotal).sum();
        CreateOrderRequest {
            customer_id: None,
            customer_name: "Ada Buyer".to_string(),
            customer_email: "ada@example.com".to_string(),
            customer_phone: "555-0100".to_string(),
            delivery_address: "1 Main St".to_string(),
            total_amount: total,
            items,
            payment_evidence: None,
        }
    }

    #[tokio::test]
    async fn test_place_order_creates_pending_order_and_decrements_stock() {
        let service = service();
        let product_id = seed_product(&service, "Workbench", 1000, 5).await;

        let placed = service
            .place_order(request(vec![item(Some(product_id), 2, 1000)]))
            .await
            .unwrap();

        assert_eq!(placed.status, OrderStatus::Pending);
        assert!(placed.order_number.starts_with("ORD-"));

        let record = service.get_order(placed.id).await.unwrap().unwrap();
        assert_eq!(record.items.len(), 1);
        assert_eq!(record.items[0].product_name, "Workbench");
        assert_eq!(record.total_amount.cents(), 2000);
        assert_eq!(
            service.store().product_stock(product_id).await.unwrap(),
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_missing_customer_name_fails_before_any_write() {
        let service = service();
        let product_id = seed_product(&service, "Workbench", 1000, 5).await;

        let mut req = request(vec![item(Some(product_id), 1, 1000)]);
        req.customer_name = "  ".to_string();

        let result = service.place_order(req).await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::MissingField {
                field: "customer_name"
            }))
        ));
        assert_eq!(service.store().order_count().await, 0);
        assert_eq!(
            service.store().product_stock(product_id).await.unwrap(),
            Some(5)
        );
    }

    #[tokio::test]
    async fn test_empty_item_list_rejected() {
        let service = service();
        let mut req = request(vec![]);
        req.total_amount = Money::zero();

        let result = service.place_order(req).await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::NoItems))
        ));
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let service = service();
        let product_id = seed_product(&service, "Workbench", 1000, 5).await;

        let mut req = request(vec![item(Some(product_id), 1, 1000)]);
        req.items[0].quantity = 0;
        req.items[0].subtotal = Money::zero();
        req.total_amount = Money::zero();

        let result = service.place_order(req).await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::InvalidQuantity { .. }))
        ));
    }

    #[tokio::test]
    async fn test_subtotal_mismatch_rejected() {
        let service = service();
        let product_id = seed_product(&service, "Workbench", 1000, 5).await;

        let mut req = request(vec![item(Some(product_id), 2, 1000)]);
        req.items[0].subtotal = Money::from_cents(1500);
        req.total_amount = Money::from_cents(1500);

        let result = service.place_order(req).await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::SubtotalMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_overflowing_price_rejected_not_panicking() {
        let service = service();
        let product_id = seed_product(&service, "Workbench", 1000, 5).await;

        let mut req = request(vec![item(Some(product_id), 1, 1000)]);
        req.items[0].unit_price = Money::from_cents(i64::MAX);
        req.items[0].quantity = 2;

        let result = service.place_order(req).await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::AmountOverflow { line: 0 }))
        ));
        assert_eq!(service.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn test_overflowing_total_sum_rejected() {
        let service = service();
        let big = Money::from_cents(i64::MAX);

        let mut req = request(vec![item(None, 1, 1000)]);
        req.items = vec![
            OrderItemRequest {
                product_id: None,
                product_name: Some("First".to_string()),
                quantity: 1,
                unit_price: big,
                subtotal: big,
            },
            OrderItemRequest {
                product_id: None,
                product_name: Some("Second".to_string()),
                quantity: 1,
                unit_price: big,
                subtotal: big,
            },
        ];

        let result = service.place_order(req).await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::AmountOverflow { line: 1 }))
        ));
    }

    #[tokio::test]
    async fn test_total_mismatch_rejected() {
        let service = service();
        let product_id = seed_product(&service, "Workbench", 1000, 5).await;

        let mut req = request(vec![item(Some(product_id), 2, 1000)]);
        req.total_amount = Money::from_cents(9999);

        let result = service.place_order(req).await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::TotalMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_insufficient_stock_fails_atomically() {
        let service = service();
        let product_id = seed_product(&service, "Workbench", 1000, 1).await;

        let result = service
            .place_order(request(vec![item(Some(product_id), 5, 1000)]))
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Store(StoreError::InsufficientStock { .. }))
        ));
        assert_eq!(service.store().order_count().await, 0);
        assert_eq!(
            service.store().product_stock(product_id).await.unwrap(),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_store_failure_leaves_no_partial_order() {
        let service = service();
        let product_id = seed_product(&service, "Workbench", 1000, 5).await;
        service.store().set_fail_on_item_insert(true).await;

        let result = service
            .place_order(request(vec![item(Some(product_id), 2, 1000)]))
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Store(StoreError::Database(_)))
        ));
        assert_eq!(service.store().order_count().await, 0);
        assert_eq!(service.store().item_count().await, 0);
        assert_eq!(
            service.store().product_stock(product_id).await.unwrap(),
            Some(5)
        );
    }

    #[tokio::test]
    async fn test_repeated_product_references_accumulate() {
        let service = service();
        let product_id = seed_product(&service, "Workbench", 1000, 10).await;

        service
            .place_order(request(vec![
                item(Some(product_id), 2, 1000),
                item(Some(product_id), 3, 1000),
            ]))
            .await
            .unwrap();

        assert_eq!(
            service.store().product_stock(product_id).await.unwrap(),
            Some(5)
        );
    }

    #[tokio::test]
    async fn test_name_resolution_prefers_supplied_name() {
        let service = service();
        let product_id = seed_product(&service, "Workbench", 1000, 5).await;

        let mut req = request(vec![item(Some(product_id), 1, 1000)]);
        req.items[0].product_name = Some("Limited Edition Workbench".to_string());

        let placed = service.place_order(req).await.unwrap();
        let record = service.get_order(placed.id).await.unwrap().unwrap();
        assert_eq!(record.items[0].product_name, "Limited Edition Workbench");
    }

    #[tokio::test]
    async fn test_name_resolution_falls_back_to_live_product_name() {
        let service = service();
        let product_id = seed_product(&service, "Oak Stool", 1000, 5).await;

        let resolved = service
            .resolve_items(&[item(Some(product_id), 1, 1000)])
            .await
            .unwrap();
        assert_eq!(resolved[0].product_name, "Oak Stool");
    }

    #[tokio::test]
    async fn test_name_resolution_placeholder_for_unknown_product() {
        let service = service();

        let resolved = service
            .resolve_items(&[item(Some(ProductId::new(42)), 1, 1000)])
            .await
            .unwrap();
        assert_eq!(resolved[0].product_name, "Product #42");
    }

    #[tokio::test]
    async fn test_name_resolution_placeholder_without_product_id() {
        let service = service();

        let resolved = service.resolve_items(&[item(None, 1, 1000)]).await.unwrap();
        assert_eq!(resolved[0].product_name, "Unknown Product");
    }

    #[tokio::test]
    async fn test_unknown_product_reference_aborts_placement() {
        let service = service();

        let result = service
            .place_order(request(vec![item(Some(ProductId::new(42)), 1, 1000)]))
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Store(StoreError::ProductNotFound(_)))
        ));
        assert_eq!(service.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn test_payment_evidence_uploaded_before_creation() {
        let service = service();
        let product_id = seed_product(&service, "Workbench", 1000, 5).await;

        let mut req = request(vec![item(Some(product_id), 1, 1000)]);
        req.payment_evidence = Some(vec![0xDE, 0xAD]);

        let placed = service.place_order(req).await.unwrap();
        let record = service.get_order(placed.id).await.unwrap().unwrap();

        let url = record.payment_evidence_url.unwrap();
        assert!(url.starts_with("mem://payment-evidence/"));
    }

    #[tokio::test]
    async fn test_evidence_upload_failure_aborts_before_any_write() {
        let store = InMemoryOrderStore::new();
        let storage = InMemoryObjectStorage::new();
        storage.set_fail_on_upload(true).await;
        let service = OrderService::new(store, storage);
        let product_id = seed_product(&service, "Workbench", 1000, 5).await;

        let mut req = request(vec![item(Some(product_id), 1, 1000)]);
        req.payment_evidence = Some(vec![0xDE, 0xAD]);

        let result = service.place_order(req).await;
        assert!(matches!(result, Err(DomainError::Storage(_))));
        assert_eq!(service.store().order_count().await, 0);
        assert_eq!(
            service.store().product_stock(product_id).await.unwrap(),
            Some(5)
        );
    }

    #[tokio::test]
    async fn test_update_status_follows_state_machine() {
        let service = service();
        let product_id = seed_product(&service, "Workbench", 1000, 5).await;

        let placed = service
            .place_order(request(vec![item(Some(product_id), 1, 1000)]))
            .await
            .unwrap();

        let record = service
            .update_status(placed.id, OrderStatus::Approved)
            .await
            .unwrap();
        assert_eq!(record.status, OrderStatus::Approved);

        let record = service
            .update_status(placed.id, OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(record.status, OrderStatus::Shipped);

        // Shipped orders can no longer be cancelled.
        let result = service
            .update_status(placed.id, OrderStatus::Cancelled)
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::InvalidStateTransition {
                from: OrderStatus::Shipped,
                to: OrderStatus::Cancelled,
            }))
        ));
    }

    #[tokio::test]
    async fn test_update_status_for_missing_order() {
        let service = service();
        let result = service
            .update_status(OrderId::new(404), OrderStatus::Approved)
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Store(StoreError::OrderNotFound(_)))
        ));
    }
}
