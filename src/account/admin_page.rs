//! The staff landing page: every account, each user's net balance and the
//! totals across the whole system.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, html};
use rust_decimal::Decimal;
use time::UtcOffset;

use crate::{
    Error,
    access::Scope,
    account::{
        FinancialAccount, Totals,
        accounts_page::{AccountPageState, TableOptions, accounts_table, load_accounts},
        my_account_page::summary_card,
        totals_absolute, totals_signed,
    },
    endpoints,
    flash::{Flash, take_flashes},
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base_with_flashes, format_currency,
    },
    navigation::NavBar,
};

fn is_below_zero(amount: Decimal) -> bool {
    amount.is_sign_negative() && !amount.is_zero()
}

fn total_cell_class(amount: Decimal) -> &'static str {
    if is_below_zero(amount) {
        "px-6 py-4 text-right tabular-nums balance-negative"
    } else {
        "px-6 py-4 text-right tabular-nums balance-positive"
    }
}

fn user_totals_table(totals: &Totals<Decimal>) -> Markup {
    html!(
        table class="w-full text-sm text-left text-gray-500 dark:text-gray-400" id="user-totals"
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "User" }
                    th scope="col" class="px-6 py-3 text-right" { "Net Balance" }
                }
            }

            tbody
            {
                @for user_total in &totals.user_totals {
                    tr class=(TABLE_ROW_STYLE)
                    {
                        th scope="row" class="px-6 py-4 font-medium text-gray-900 dark:text-white"
                        {
                            (user_total.username)
                        }

                        td class=(total_cell_class(user_total.total))
                        {
                            (format_currency(user_total.total))
                        }
                    }
                }
            }
        }
    )
}

fn admin_view(
    accounts: &[FinancialAccount],
    signed: &Totals<Decimal>,
    absolute_total: &str,
    flashes: &[Flash],
    local_offset: UtcOffset,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::ADMIN_VIEW, true).into_html();
    let options = TableOptions {
        show_owner: true,
        show_actions: true,
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Overview" }

                    a href=(endpoints::NEW_ACCOUNT_VIEW) class=(LINK_STYLE)
                    {
                        "Add Account"
                    }
                }

                div class="grid grid-cols-1 gap-4 sm:grid-cols-2"
                {
                    (summary_card(
                        "System net balance",
                        &format_currency(signed.system_total),
                        is_below_zero(signed.system_total),
                    ))
                    (summary_card("System total held", absolute_total, false))
                }

                section class="space-y-2"
                {
                    h2 class="text-lg font-semibold" { "Balances by User" }
                    (user_totals_table(signed))
                }

                section class="space-y-2"
                {
                    h2 class="text-lg font-semibold" { "All Accounts" }
                    (accounts_table(accounts, options, local_offset))
                }
            }
        }
    );

    base_with_flashes("Admin", flashes, &content)
}

/// Renders every account with the signed total of each user, the signed
/// system total and the sum of all balance magnitudes.
///
/// Only reachable through [staff_guard](crate::permission_denied::staff_guard).
pub async fn get_admin_page(
    State(state): State<AccountPageState>,
    jar: PrivateCookieJar,
) -> Result<Response, Error> {
    let accounts = load_accounts(&state, Scope::All)?;

    let signed = totals_signed(&accounts, None);
    let absolute = totals_absolute(&accounts, None);

    let (jar, flashes) = take_flashes(jar);
    let view = admin_view(
        &accounts,
        &signed,
        &absolute.system_total,
        &flashes,
        state.local_timezone.offset_now(),
    );

    Ok((jar, view).into_response())
}

#[cfg(test)]
mod get_admin_page_tests {
    use axum_test::TestServer;
    use rust_decimal_macros::dec;
    use scraper::{Html, Selector};

    use crate::{
        build_router, endpoints,
        permission_denied::STAFF_ONLY_MESSAGE,
        test_utils::{
            assert_valid_html, create_test_account, create_test_user, get_test_app_state,
            log_in_as,
        },
    };

    fn texts(html: &Html, selector: &str) -> Vec<String> {
        html.select(&Selector::parse(selector).unwrap())
            .map(|element| element.text().collect::<String>().trim().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn shows_system_and_per_user_totals() {
        let state = get_test_app_state();
        let admin = create_test_user(&state, "admin", true);
        let alice = create_test_user(&state, "alice", false);
        let bob = create_test_user(&state, "bob", false);
        create_test_account(&state, &alice, "checking", dec!(100.00), false);
        create_test_account(&state, &alice, "credit card", dec!(50.00), true);
        create_test_account(&state, &bob, "savings", dec!(200.00), false);
        let server = TestServer::new(build_router(state)).unwrap();
        let cookies = log_in_as(&server, &admin).await.cookies();

        let response = server.get(endpoints::ADMIN_VIEW).add_cookies(cookies).await;

        response.assert_status_ok();
        let html = Html::parse_document(&response.text());
        assert_valid_html(&html);
        assert_eq!(
            texts(&html, "[data-summary='System net balance'] div.font-bold"),
            vec!["$250.00"]
        );
        assert_eq!(
            texts(&html, "[data-summary='System total held'] div.font-bold"),
            vec!["$350.00"]
        );
        assert_eq!(texts(&html, "#user-totals tbody th"), vec!["alice", "bob"]);
        assert_eq!(
            texts(&html, "#user-totals tbody td"),
            vec!["$50.00", "$200.00"]
        );
        assert_eq!(
            html.select(&Selector::parse("tbody tr[data-account-id]").unwrap())
                .count(),
            3
        );
    }

    #[tokio::test]
    async fn regular_user_is_turned_away() {
        let state = get_test_app_state();
        let alice = create_test_user(&state, "alice", false);
        let server = TestServer::new(build_router(state)).unwrap();
        let cookies = log_in_as(&server, &alice).await.cookies();

        let response = server.get(endpoints::ADMIN_VIEW).add_cookies(cookies).await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::MY_ACCOUNT_VIEW);

        let page = server
            .get(endpoints::LOG_IN_VIEW)
            .add_cookies(response.cookies())
            .await
            .text();
        assert!(page.contains(STAFF_ONLY_MESSAGE));
    }
}
