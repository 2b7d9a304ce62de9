//! Expenses API.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::client::TallyClient;
use crate::error::Result;
use crate::types::{Expense, ExpenseRequest, ExpenseSummary, Page};

/// Default page size for expense searches.
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Query parameters for searching expenses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Free-text search over merchant and note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    pub page: u32,
    pub size: u32,
    /// Sort expression, e.g. `expenseDate,desc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl ExpenseQuery {
    /// First page of expenses between `from` and `to`, inclusive.
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from,
            to,
            category_id: None,
            min: None,
            max: None,
            q: None,
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: None,
        }
    }
}

#[derive(Serialize)]
struct RangeQuery {
    from: NaiveDate,
    to: NaiveDate,
}

/// Expenses API client.
pub struct ExpensesApi {
    client: TallyClient,
}

impl ExpensesApi {
    pub(crate) fn new(client: TallyClient) -> Self {
        Self { client }
    }

    /// Search expenses.
    pub async fn search(&self, query: &ExpenseQuery) -> Result<Page<Expense>> {
        self.client.get_with_query("api/expenses", query).await
    }

    /// Total amount and count between two dates.
    pub async fn summary(&self, from: NaiveDate, to: NaiveDate) -> Result<ExpenseSummary> {
        self.client
            .get_with_query("api/expenses/summary", &RangeQuery { from, to })
            .await
    }

    /// Create an expense.
    pub async fn create(&self, request: &ExpenseRequest) -> Result<()> {
        self.client.post("api/expenses", request).await
    }

    /// Update an expense.
    pub async fn update(&self, id: Uuid, request: &ExpenseRequest) -> Result<()> {
        self.client.put(&format!("api/expenses/{}", id), request).await
    }

    /// Delete an expense.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.client.delete(&format!("api/expenses/{}", id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query = ExpenseQuery::between(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["from"], "2024-01-01");
        assert_eq!(json["page"], 0);
        assert_eq!(json["size"], 10);
        assert!(json.get("categoryId").is_none());
    }
}
