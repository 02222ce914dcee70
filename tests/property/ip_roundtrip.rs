//! Parser/renderer round-trip properties.

use ipfreq::{format_ip, TagExtractor};
use ipfreq::extract::parse_ip_key;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// For every well-formed dotted quad, parse-then-render is identity.
    #[test]
    fn well_formed_quads_round_trip(a in 0u8..=255, b in 0u8..=255, c in 0u8..=255, d in 0u8..=255) {
        let rendered = format!("{a}.{b}.{c}.{d}");
        let key = parse_ip_key(rendered.as_bytes());
        prop_assert_eq!(format_ip(key), rendered);
        prop_assert_eq!(key, u32::from_be_bytes([a, b, c, d]));
    }

    /// A tagged quad embedded in arbitrary line noise is extracted with the
    /// same key the standalone parser produces.
    #[test]
    fn extraction_matches_standalone_parse(
        a in 0u8..=255, b in 0u8..=255, c in 0u8..=255, d in 0u8..=255,
        prefix in "[ -:<>-~]{0,20}",
        suffix in "[ -~]{0,20}",
    ) {
        let quad = format!("{a}.{b}.{c}.{d}");
        let line = format!("{prefix}ip={quad};{suffix}\n");

        let ex = TagExtractor::new();
        let (key, _next) = ex.extract_next(line.as_bytes(), 0).unwrap();
        // `prefix` excludes `;` and `=`, so the first tag hit is ours.
        prop_assert_eq!(key, parse_ip_key(quad.as_bytes()));
    }
}
