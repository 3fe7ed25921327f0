//! The landing page for regular users: their own accounts and what they add up to.

use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, html};
use rust_decimal::Decimal;
use time::UtcOffset;

use crate::{
    Error, User,
    access::Scope,
    account::{
        FinancialAccount,
        accounts_page::{AccountPageState, TableOptions, accounts_table, load_accounts},
        totals_absolute, totals_signed,
    },
    endpoints,
    flash::{Flash, take_flashes},
    html::{PAGE_CONTAINER_STYLE, base_with_flashes, format_currency},
    navigation::NavBar,
};

/// A labelled amount shown above the accounts table.
pub(super) fn summary_card(label: &str, amount: &str, is_negative: bool) -> Markup {
    let amount_class = if is_negative {
        "text-2xl font-bold tabular-nums balance-negative"
    } else {
        "text-2xl font-bold tabular-nums balance-positive"
    };

    html!(
        div
            class="rounded border border-gray-200 bg-white px-4 py-3 shadow-sm dark:border-gray-700 dark:bg-gray-800"
            data-summary=(label)
        {
            div class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            div class=(amount_class) { (amount) }
        }
    )
}

struct MyAccountSummary {
    username: String,
    net_balance: Decimal,
    total_held: String,
}

fn my_account_view(
    summary: &MyAccountSummary,
    accounts: &[FinancialAccount],
    show_admin: bool,
    flashes: &[Flash],
    local_offset: UtcOffset,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::MY_ACCOUNT_VIEW, show_admin).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-5xl"
            {
                h1 class="text-xl font-bold" { "Welcome, " (summary.username) }

                div class="grid grid-cols-1 gap-4 sm:grid-cols-2"
                {
                    (summary_card(
                        "Net balance",
                        &format_currency(summary.net_balance),
                        summary.net_balance.is_sign_negative() && !summary.net_balance.is_zero(),
                    ))
                    (summary_card("Total held across accounts", &summary.total_held, false))
                }

                (accounts_table(accounts, TableOptions::default(), local_offset))
            }
        }
    );

    base_with_flashes("My Account", flashes, &content)
}

/// Renders the user's own accounts with their net balance and the total of
/// the balance magnitudes.
pub async fn get_my_account_page(
    State(state): State<AccountPageState>,
    Extension(user): Extension<User>,
    jar: PrivateCookieJar,
) -> Result<Response, Error> {
    let accounts = load_accounts(&state, Scope::OwnedBy(user.id))?;

    let signed = totals_signed(&accounts, Some(user.id));
    let absolute = totals_absolute(&accounts, Some(user.id));
    let summary = MyAccountSummary {
        username: user.username.clone(),
        net_balance: signed.user_total.unwrap_or(signed.system_total),
        total_held: absolute.user_total.unwrap_or(absolute.system_total),
    };

    let (jar, flashes) = take_flashes(jar);
    let view = my_account_view(
        &summary,
        &accounts,
        state.access_policy.can_view_all(&user),
        &flashes,
        state.local_timezone.offset_now(),
    );

    Ok((jar, view).into_response())
}
