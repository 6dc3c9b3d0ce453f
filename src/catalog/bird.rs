/// Embedded catalog source.
pub const SOURCE: &str = include_str!("../../catalogs/bird.toml");

#[cfg(test)]
mod tests {
    use crate::catalog::testutil::resolve;
    use crate::error::ResolutionError;

    #[test]
    fn bgp_route_v4() {
        assert_eq!(
            resolve("bird", "__hyperglass_bird_bgp_route__", "198.51.100.0/24").unwrap(),
            vec![r#"birdc "show route all where 198.51.100.0/24 ~ net""#]
        );
    }

    #[test]
    fn bgp_route_v6() {
        assert_eq!(
            resolve("bird", "__hyperglass_bird_bgp_route__", "2001:db8::/32").unwrap(),
            vec![r#"birdc "show route all where 2001:db8::/32 ~ net""#]
        );
    }

    #[test]
    fn bgp_route_hostname_has_no_rule() {
        assert!(matches!(
            resolve("bird", "__hyperglass_bird_bgp_route__", "example.net"),
            Err(ResolutionError::NoApplicableRule { .. })
        ));
    }

    #[test]
    fn bgp_aspath() {
        assert_eq!(
            resolve("bird", "__hyperglass_bird_bgp_aspath__", "[= * 65000 * =]").unwrap(),
            vec![r#"birdc "show route all where bgp_path ~ [= * 65000 * =]""#]
        );
    }

    #[test]
    fn bgp_community() {
        assert_eq!(
            resolve("bird", "__hyperglass_bird_bgp_community__", "(65000,100)").unwrap(),
            vec![r#"birdc "show route all where (65000,100) ~ bgp_community""#]
        );
    }

    #[test]
    fn ping_picks_family_source() {
        assert_eq!(
            resolve("bird", "__hyperglass_bird_ping__", "192.0.2.1").unwrap(),
            vec!["ping -4 -c 5 -I 192.0.2.254 192.0.2.1"]
        );
        assert_eq!(
            resolve("bird", "__hyperglass_bird_ping__", "2001:db8::1").unwrap(),
            vec!["ping -6 -c 5 -I 2001:db8::fe 2001:db8::1"]
        );
    }

    #[test]
    fn traceroute_v6() {
        assert_eq!(
            resolve("bird", "__hyperglass_bird_traceroute__", "2001:db8:1::1").unwrap(),
            vec!["traceroute -6 -w 1 -q 1 -s 2001:db8::fe 2001:db8:1::1"]
        );
    }

    #[test]
    fn quote_breakout_rejected() {
        assert!(matches!(
            resolve("bird", "__hyperglass_bird_bgp_aspath__", r#"x" ; reboot ; ""#),
            Err(ResolutionError::FieldValidation(_))
        ));
    }

    #[test]
    fn shell_variables_refused() {
        for (id, target) in [
            ("__hyperglass_bird_bgp_community__", "$HOME"),
            ("__hyperglass_bird_bgp_aspath__", "[= * $X * =]"),
        ] {
            assert!(
                matches!(resolve("bird", id, target), Err(ResolutionError::FieldValidation(_))),
                "{target}"
            );
        }
    }
}
