//! Merge the base instructions with fetched user context.

use serde_json::Value;

use crate::context::UserContext;

pub const ORDERS_HEADER: &str = "\n\nHere is the user's order details for reference:\n";

pub const FOOD_LOG_HEADER: &str = "\n\nHere is the user's food log data for the last 7 days. \
Analyze this data and provide nutrition and habit analysis, including \
what the user is doing right, what they are doing wrong, and what they can improve:\n";

/// Append the serialized order and food-log payloads to `base` under fixed
/// section headers. Payloads are passed through as compact JSON.
pub fn compose_instructions(base: &str, orders: &Value, food_log: &Value) -> String {
    let section = context_section(orders, food_log);
    let mut out = String::with_capacity(base.len() + section.len());
    out.push_str(base);
    out.push_str(&section);
    out
}

/// The part appended to the base instructions.
pub fn context_section(orders: &Value, food_log: &Value) -> String {
    let orders = orders.to_string();
    let food_log = food_log.to_string();

    let mut out = String::with_capacity(
        ORDERS_HEADER.len() + orders.len() + FOOD_LOG_HEADER.len() + food_log.len(),
    );
    out.push_str(ORDERS_HEADER);
    out.push_str(&orders);
    out.push_str(FOOD_LOG_HEADER);
    out.push_str(&food_log);
    out
}

pub fn context_section_for(context: &UserContext) -> String {
    context_section(&context.orders, &context.food_log)
}
