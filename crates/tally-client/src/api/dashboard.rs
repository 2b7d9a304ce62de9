//! Dashboard API.

use chrono::NaiveDate;
use serde::Serialize;

use crate::client::TallyClient;
use crate::error::Result;
use crate::types::{CategorySpend, DashboardResponse, MerchantSpend};

/// Default number of top categories on the dashboard.
const DEFAULT_TOP: u32 = 5;

/// Default number of merchants in the merchant breakdown.
const DEFAULT_MERCHANT_LIMIT: u32 = 10;

/// Optional date bounds. The server picks the range when both are absent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

/// Query parameters for the dashboard overview.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardQuery {
    #[serde(flatten)]
    pub range: DateRange,
    pub top: u32,
}

impl Default for DashboardQuery {
    fn default() -> Self {
        Self {
            range: DateRange::default(),
            top: DEFAULT_TOP,
        }
    }
}

#[derive(Serialize)]
struct MerchantQuery<'a> {
    #[serde(flatten)]
    range: &'a DateRange,
    limit: u32,
}

/// Dashboard API client.
pub struct DashboardApi {
    client: TallyClient,
}

impl DashboardApi {
    pub(crate) fn new(client: TallyClient) -> Self {
        Self { client }
    }

    /// Totals, top categories and the monthly series.
    pub async fn overview(&self, query: &DashboardQuery) -> Result<DashboardResponse> {
        self.client.get_with_query("api/dashboard", query).await
    }

    /// Spend grouped by category.
    pub async fn spend_by_category(&self, range: &DateRange) -> Result<Vec<CategorySpend>> {
        self.client
            .get_with_query("api/dashboard/categories", range)
            .await
    }

    /// Spend grouped by merchant, largest first. `limit` defaults to 10.
    pub async fn spend_by_merchant(
        &self,
        range: &DateRange,
        limit: Option<u32>,
    ) -> Result<Vec<MerchantSpend>> {
        let query = MerchantQuery {
            range,
            limit: limit.unwrap_or(DEFAULT_MERCHANT_LIMIT),
        };
        self.client
            .get_with_query("api/dashboard/merchants", &query)
            .await
    }
}
