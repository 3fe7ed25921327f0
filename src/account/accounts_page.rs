//! Displays the accounts a user may see and their balances.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};
use rusqlite::Connection;
use time::{UtcOffset, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AccessPolicy, AppState, Error, LocalTimezone, User,
    access::Scope,
    account::{FinancialAccount, display_balance},
    endpoints::{self, format_endpoint},
    flash::{Flash, take_flashes},
    html::{
        BUTTON_DELETE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base_with_flashes,
    },
    navigation::NavBar,
};

/// The state needed by the pages that list accounts.
#[derive(Debug, Clone)]
pub struct AccountPageState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The server's local timezone, used to display update times.
    pub local_timezone: LocalTimezone,
    pub db_connection: Arc<Mutex<Connection>>,
    /// Decides which accounts the user may see.
    pub access_policy: Arc<dyn AccessPolicy>,
}

impl FromRef<AppState> for AccountPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
            access_policy: state.access_policy.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AccountPageState> for Key {
    fn from_ref(state: &AccountPageState) -> Self {
        state.cookie_key.clone()
    }
}

/// Load the accounts in `scope`.
pub(super) fn load_accounts(
    state: &AccountPageState,
    scope: Scope,
) -> Result<Vec<FinancialAccount>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    scope
        .load(&connection)
        .inspect_err(|error| tracing::error!("could not load accounts for {scope:?}: {error}"))
}

/// Which optional columns an accounts table shows.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct TableOptions {
    /// Show the owner's username, for tables that span several users.
    pub show_owner: bool,
    /// Show edit and delete controls.
    pub show_actions: bool,
}

const LAST_UPDATED_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

fn format_last_updated(account: &FinancialAccount, local_offset: UtcOffset) -> String {
    let last_updated = account.last_updated.to_offset(local_offset);

    last_updated
        .format(LAST_UPDATED_FORMAT)
        .unwrap_or_else(|_| last_updated.to_string())
}

fn balance_class(account: &FinancialAccount) -> &'static str {
    if account.is_negative {
        "px-6 py-4 text-right tabular-nums balance-negative"
    } else {
        "px-6 py-4 text-right tabular-nums balance-positive"
    }
}

/// A table listing `accounts`.
pub(super) fn accounts_table(
    accounts: &[FinancialAccount],
    options: TableOptions,
    local_offset: UtcOffset,
) -> Markup {
    let column_count = 3 + usize::from(options.show_owner) + usize::from(options.show_actions);

    html!(
        section class="w-full overflow-x-auto dark:bg-gray-800 lg:max-w-5xl lg:mx-auto"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        @if options.show_owner {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Owner" }
                        }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Account" }
                        th scope="col" class="px-6 py-3 text-right" { "Balance" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Last Updated" }
                        @if options.show_actions {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }
                }

                tbody
                {
                    @for account in accounts {
                        tr class=(TABLE_ROW_STYLE) data-account-id=(account.id)
                        {
                            @if options.show_owner {
                                td class=(TABLE_CELL_STYLE) { (account.owner_username) }
                            }

                            th
                                scope="row"
                                class="px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
                            {
                                (account.account_type)
                                @if let Some(number) = &account.account_number {
                                    " " span class="text-gray-500" { (number) }
                                }
                            }

                            td class=(balance_class(account)) { (display_balance(account)) }

                            td class=(TABLE_CELL_STYLE)
                            {
                                (format_last_updated(account, local_offset))
                            }

                            @if options.show_actions {
                                td class=(TABLE_CELL_STYLE)
                                {
                                    div class="flex gap-4"
                                    {
                                        a
                                            href=(format_endpoint(endpoints::EDIT_ACCOUNT_VIEW, account.id))
                                            class=(LINK_STYLE)
                                        {
                                            "Edit"
                                        }

                                        button
                                            hx-delete=(format_endpoint(endpoints::ACCOUNT_API, account.id))
                                            hx-confirm={
                                                "Are you sure you want to delete the account '"
                                                (account.display_name())
                                                "'? This cannot be undone."
                                            }
                                            hx-target="closest tr"
                                            hx-target-error="#alert-container"
                                            hx-swap="delete"
                                            class=(BUTTON_DELETE_STYLE)
                                        {
                                            "Delete"
                                        }
                                    }
                                }
                            }
                        }
                    }

                    @if accounts.is_empty() {
                        tr
                        {
                            td
                                colspan=(column_count)
                                class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                            {
                                "No accounts found."
                            }
                        }
                    }
                }
            }
        }
    )
}

fn accounts_view(
    accounts: &[FinancialAccount],
    show_all: bool,
    flashes: &[Flash],
    local_offset: UtcOffset,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::ACCOUNTS_VIEW, show_all).into_html();
    let options = TableOptions {
        show_owner: show_all,
        show_actions: false,
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full"
            {
                header class="flex justify-between flex-wrap items-end lg:max-w-5xl lg:mx-auto"
                {
                    h1 class="text-xl font-bold"
                    {
                        @if show_all { "All Accounts" } @else { "Your Accounts" }
                    }
                }

                (accounts_table(accounts, options, local_offset))
            }
        }
    );

    base_with_flashes("Accounts", flashes, &content)
}

/// Renders the accounts the user may see: every account for privileged
/// users, otherwise only their own.
pub async fn get_accounts_page(
    State(state): State<AccountPageState>,
    Extension(user): Extension<User>,
    jar: PrivateCookieJar,
) -> Result<Response, Error> {
    let scope = Scope::for_user(state.access_policy.as_ref(), &user);
    let accounts = load_accounts(&state, scope)?;
    let (jar, flashes) = take_flashes(jar);

    let view = accounts_view(
        &accounts,
        scope == Scope::All,
        &flashes,
        state.local_timezone.offset_now(),
    );

    Ok((jar, view).into_response())
}


#[cfg(test)]
mod get_accounts_page_tests {
    use axum_test::TestServer;
    use rust_decimal_macros::dec;
    use scraper::{Html, Selector};

    use crate::{
        build_router, endpoints,
        test_utils::{
            assert_valid_html, create_test_account, create_test_user, get_test_app_state,
            log_in_as,
        },
    };

    fn account_types_in(page: &str) -> Vec<String> {
        Html::parse_document(page)
            .select(&Selector::parse("tbody tr th").unwrap())
            .map(|cell| cell.text().collect::<String>().trim().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn regular_user_sees_only_own_accounts() {
        let state = get_test_app_state();
        let alice = create_test_user(&state, "alice", false);
        let bob = create_test_user(&state, "bob", false);
        create_test_account(&state, &alice, "checking", dec!(100), false);
        create_test_account(&state, &bob, "savings", dec!(200), false);
        let server = TestServer::new(build_router(state)).unwrap();
        let cookies = log_in_as(&server, &alice).await.cookies();

        let response = server
            .get(endpoints::ACCOUNTS_VIEW)
            .add_cookies(cookies)
            .await;

        response.assert_status_ok();
        let page = response.text();
        assert_valid_html(&Html::parse_document(&page));
        assert_eq!(account_types_in(&page), vec!["checking"]);
        assert!(page.contains("Your Accounts"));
    }

    #[tokio::test]
    async fn staff_sees_every_account_ordered_by_owner() {
        let state = get_test_app_state();
        let admin = create_test_user(&state, "admin", true);
        let alice = create_test_user(&state, "alice", false);
        let bob = create_test_user(&state, "bob", false);
        create_test_account(&state, &bob, "savings", dec!(200), false);
        create_test_account(&state, &alice, "savings", dec!(50), true);
        create_test_account(&state, &alice, "checking", dec!(100), false);
        let server = TestServer::new(build_router(state)).unwrap();
        let cookies = log_in_as(&server, &admin).await.cookies();

        let response = server
            .get(endpoints::ACCOUNTS_VIEW)
            .add_cookies(cookies)
            .await;

        response.assert_status_ok();
        let page = response.text();
        assert_eq!(account_types_in(&page), vec!["checking", "savings", "savings"]);
        assert!(page.contains("All Accounts"));
        assert!(page.contains("-$50.00"));
    }
}
