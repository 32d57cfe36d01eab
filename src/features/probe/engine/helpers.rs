use crate::config::Target;
use crate::probe::{ProbeError, ProbeErrorKind};
use curl::Error as CurlError;

pub(super) fn map_curl_error(err: &CurlError) -> ProbeError {
    let message = err.to_string();

    let kind = if err.is_couldnt_resolve_host() || err.is_couldnt_resolve_proxy() {
        ProbeErrorKind::DnsFailed
    } else if err.is_operation_timedout() {
        ProbeErrorKind::ConnectTimeout
    } else if err.is_couldnt_connect() {
        ProbeErrorKind::ConnectFailed
    } else {
        ProbeErrorKind::IoError
    };

    ProbeError { kind, message }
}

/// Connect-only transfers never send a request, so the scheme only selects the default port.
pub(super) fn connect_url(target: &Target) -> String {
    format!("http://{}:{}/", target.host, target.port)
}
