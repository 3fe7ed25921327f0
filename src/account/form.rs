//! The form shared by the create and edit account pages.

use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    Error, User, UserID,
    account::{
        ACCOUNT_NUMBER_MAX_LENGTH, ACCOUNT_TYPE_MAX_LENGTH, FinancialAccount, Magnitude,
        NewAccount,
    },
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        loading_spinner, text_input,
    },
    navigation::NavBar,
};

/// The raw form data for creating or updating an account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountForm {
    /// The ID of the user that owns the account.
    pub owner: i64,
    pub account_type: String,
    /// Blank when the account has no number.
    pub account_number: Option<String>,
    /// The balance magnitude in dollars, e.g. "1234.56".
    pub balance: String,
    /// Checkbox, any value means the balance is negative.
    pub is_negative: Option<String>,
}

impl AccountForm {
    /// Parse and check the form fields.
    ///
    /// # Errors
    /// Returns the validation errors of [Magnitude::parse] and [NewAccount::new].
    pub fn validate(&self) -> Result<NewAccount, Error> {
        let balance = Magnitude::parse(&self.balance)?;

        NewAccount::new(
            UserID::new(self.owner),
            &self.account_type,
            self.account_number.as_deref(),
            balance,
            self.is_negative.is_some(),
        )
    }
}

/// The values to prefill the form with.
#[derive(Debug, Default, Clone, PartialEq)]
pub(super) struct AccountFormValues {
    pub owner: Option<UserID>,
    pub account_type: String,
    pub account_number: String,
    pub balance: String,
    pub is_negative: bool,
}

impl From<&FinancialAccount> for AccountFormValues {
    fn from(account: &FinancialAccount) -> Self {
        Self {
            owner: Some(account.owner),
            account_type: account.account_type.clone(),
            account_number: account.account_number.clone().unwrap_or_default(),
            balance: account.balance.as_decimal().to_string(),
            is_negative: account.is_negative,
        }
    }
}

/// An account form that posts to `action_endpoint`.
pub(super) fn account_form_view(
    action_endpoint: &str,
    submit_label: &str,
    users: &[User],
    values: &AccountFormValues,
) -> Markup {
    html! {
        form
            hx-post=(action_endpoint)
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="owner" class=(FORM_LABEL_STYLE) { "Owner" }

                select
                    id="owner"
                    name="owner"
                    required
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for user in users {
                        option
                            value=(user.id.as_i64())
                            selected[values.owner == Some(user.id)]
                        {
                            (user.username)
                        }
                    }
                }
            }

            (text_input(
                "account_type",
                "Account Type",
                &values.account_type,
                true,
                Some(ACCOUNT_TYPE_MAX_LENGTH),
            ))

            (text_input(
                "account_number",
                "Account Number (optional)",
                &values.account_number,
                false,
                Some(ACCOUNT_NUMBER_MAX_LENGTH),
            ))

            div
            {
                label for="balance" class=(FORM_LABEL_STYLE) { "Balance" }

                input
                    type="number"
                    id="balance"
                    name="balance"
                    min="0"
                    step="0.01"
                    required
                    placeholder="0.00"
                    value=(values.balance)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    id="is_negative"
                    name="is_negative"
                    checked[values.is_negative]
                    class="rounded-xs";

                label for="is_negative" class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Balance is negative (e.g. overdrawn or owing)"
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                (submit_label)
            }
        }
    }
}

/// A full page with the navigation bar above `form`.
pub(super) fn account_form_page(title: &str, active_endpoint: &str, form: &Markup) -> Markup {
    let nav_bar = NavBar::new(active_endpoint, true).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { (title) }

            (form)
        }
    };

    base(title, &content)
}
