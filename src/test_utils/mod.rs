#![allow(missing_docs)]

pub(crate) mod fixtures;
pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;

pub(crate) use fixtures::{
    TEST_PASSWORD, create_test_account, create_test_user, get_test_app_state, log_in_as,
};
pub(crate) use form::{
    assert_form_input, assert_form_input_with_value, assert_form_submit_button,
    assert_hx_endpoint, must_get_form,
};
pub(crate) use html::{assert_valid_html, parse_html_document, parse_html_fragment};
pub(crate) use http::{assert_content_type, get_header};
