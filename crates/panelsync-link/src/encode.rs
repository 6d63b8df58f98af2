//! Percent-encoding sets for link components.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

/// Query values: everything except RFC 3986 unreserved characters.
pub(crate) const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Fragment label: unreserved characters and `/` stay literal.
pub(crate) const FRAGMENT: &AsciiSet = &QUERY_VALUE.remove(b'/');
