//! Property-based test generators using proptest.
//!
//! Provides strategies for generating dashboard locations, stream
//! layouts and server versions.

use proptest::prelude::*;

/// Strategy for stream pathnames, including characters that need
/// escaping in backup directory names.
pub fn stream_pathname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("/(anonymous|public|private)/[a-z0-9 +%._-]{0,12}")
        .expect("Invalid regex")
        .prop_map(|p| if p.ends_with('/') { p } else { format!("{p}/") })
}

/// Strategy for bundle content (arbitrary bytes).
pub fn bundle_content_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}

/// Strategy for a set of streams with their bundle contents.
///
/// Pathnames are unique; contents may repeat, as they do in practice.
pub fn stream_layout_strategy() -> impl Strategy<Value = Vec<(String, Vec<Vec<u8>>)>> {
    prop::collection::btree_map(
        stream_pathname_strategy(),
        prop::collection::vec(bundle_content_strategy(), 0..4),
        0..4,
    )
    .prop_map(|streams| streams.into_iter().collect())
}

/// Strategy for five-part server versions such as `0.4.0.candidate.5`.
pub fn server_version_strategy() -> impl Strategy<Value = String> {
    (
        0u32..3,
        0u32..12,
        0u32..5,
        prop_oneof![
            Just("dev"),
            Just("alpha"),
            Just("beta"),
            Just("candidate"),
            Just("final"),
        ],
        0u32..200,
    )
        .prop_map(|(major, minor, micro, level, serial)| {
            format!("{major}.{minor}.{micro}.{level}.{serial}")
        })
}

/// Strategy for user supplied dashboard locations.
pub fn dashboard_location_strategy() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just(""), Just("http://"), Just("https://")],
        prop_oneof![Just(""), Just("alice@"), Just("alice:TOKEN@")],
        prop::string::string_regex("[a-z]{1,8}(\\.[a-z]{2,4})?").expect("Invalid regex"),
        prop_oneof![Just(""), Just(":8000")],
        prop::string::string_regex("(/[a-z]{1,6}){0,2}/?").expect("Invalid regex"),
    )
        .prop_map(|(scheme, user, host, port, path)| format!("{scheme}{user}{host}{port}{path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lavadash_engine::{Endpoint, EndpointStyle};
    use lavadash_protocol::ServerVersion;

    proptest! {
        #[test]
        fn pathnames_are_slash_delimited(p in stream_pathname_strategy()) {
            prop_assert!(p.starts_with('/'));
            prop_assert!(p.ends_with('/'));
        }

        #[test]
        fn versions_parse(v in server_version_strategy()) {
            prop_assert!(v.parse::<ServerVersion>().is_ok());
        }

        #[test]
        fn locations_resolve(l in dashboard_location_strategy()) {
            prop_assert!(Endpoint::parse(&l, EndpointStyle::XmlRpc).is_ok());
        }
    }
}
