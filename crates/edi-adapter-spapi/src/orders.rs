//! Decoding of purchase order pages

use edi_pipeline::OrderRecord;
use serde_json::Value;
use tracing::warn;

/// Orders of one page and the token of the next, if any
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderPage {
    pub orders: Vec<OrderRecord>,
    pub next_token: Option<String>,
}

/// Decode one response body.
///
/// Orders are taken from `payload.orders`, then `orders`, then the body
/// itself when it is an array. Each order's identifier is the string at
/// `id_field`; orders without one are skipped.
pub fn parse_page(body: &Value, id_field: &str) -> OrderPage {
    let payload = body.get("payload").unwrap_or(body);

    let items = payload
        .get("orders")
        .and_then(Value::as_array)
        .or_else(|| body.get("orders").and_then(Value::as_array))
        .or_else(|| body.as_array());

    let mut orders = Vec::new();
    for item in items.into_iter().flatten() {
        match item.get(id_field).and_then(Value::as_str) {
            Some(id) => orders.push(OrderRecord::new(id, item.clone())),
            None => warn!(id_field, "Skipping order without identifier"),
        }
    }

    let next_token = payload
        .get("pagination")
        .and_then(|p| p.get("nextToken"))
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    OrderPage { orders, next_token }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(page: &OrderPage) -> Vec<&str> {
        page.orders.iter().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn test_payload_orders_with_pagination() {
        let body = json!({
            "payload": {
                "pagination": { "nextToken": "page-2" },
                "orders": [
                    { "purchaseOrderNumber": "0000150", "purchaseOrderState": "New" },
                    { "purchaseOrderNumber": "0000120" }
                ]
            }
        });

        let page = parse_page(&body, "purchaseOrderNumber");
        assert_eq!(ids(&page), ["0000150", "0000120"]);
        assert_eq!(page.next_token.as_deref(), Some("page-2"));
        assert_eq!(page.orders[0].payload["purchaseOrderState"], "New");
    }

    #[test]
    fn test_top_level_orders_and_array() {
        let body = json!({ "orders": [{ "id": "A" }] });
        assert_eq!(ids(&parse_page(&body, "id")), ["A"]);

        let body = json!([{ "id": "B" }, { "id": "C" }]);
        let page = parse_page(&body, "id");
        assert_eq!(ids(&page), ["B", "C"]);
        assert!(page.next_token.is_none());
    }

    #[test]
    fn test_orders_without_string_id_are_skipped() {
        let body = json!({ "payload": { "orders": [
            { "purchaseOrderNumber": 42 },
            { "other": "x" },
            { "purchaseOrderNumber": "0000001" }
        ]}});

        assert_eq!(ids(&parse_page(&body, "purchaseOrderNumber")), ["0000001"]);
    }

    #[test]
    fn test_empty_next_token_ends_pagination() {
        let body = json!({ "payload": { "orders": [], "pagination": { "nextToken": "" } } });
        assert_eq!(parse_page(&body, "purchaseOrderNumber"), OrderPage::default());
    }

    #[test]
    fn test_unrecognized_body_is_empty_page() {
        let body = json!({ "errors": [{ "code": "InvalidInput" }] });
        assert!(parse_page(&body, "purchaseOrderNumber").orders.is_empty());
    }
}
