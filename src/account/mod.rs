//! Financial accounts: the record and its store, balance totals, and the pages
//! for viewing and managing accounts.

mod accounts_page;
mod admin_page;
mod aggregate;
mod core;
mod create_endpoint;
mod create_page;
mod delete_endpoint;
mod edit_endpoint;
mod edit_page;
mod form;
mod my_account_page;

pub use accounts_page::get_accounts_page;
pub use admin_page::get_admin_page;
pub use aggregate::{
    Totals, UserTotal, actual_balance, display_balance, totals_absolute, totals_signed,
};
pub(crate) use core::SELECT_ACCOUNTS;
pub use core::{
    ACCOUNT_NUMBER_MAX_LENGTH, ACCOUNT_TYPE_MAX_LENGTH, AccountId, FinancialAccount, Magnitude,
    NewAccount, create_account, create_account_table, delete_account, get_account,
    map_row_to_account, update_account,
};
pub use create_endpoint::create_account_endpoint;
pub use create_page::get_create_account_page;
pub use delete_endpoint::delete_account_endpoint;
pub use edit_endpoint::edit_account_endpoint;
pub use edit_page::get_edit_account_page;
pub use my_account_page::get_my_account_page;
