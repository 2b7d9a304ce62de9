//! API endpoint implementations.

mod auth;
mod categories;
mod dashboard;
mod expenses;

pub use auth::AuthApi;
pub use categories::CategoriesApi;
pub use dashboard::{DashboardApi, DashboardQuery, DateRange};
pub use expenses::{ExpenseQuery, ExpensesApi};
