use crate::error::DeliveryError;
use crate::net::{SimConfig, Stats, Topology};
use crate::test::fixtures::{addr, one_router, one_router_with_mtus, router_chain, same_subnet};
use crate::topo::build_topology;
use crate::trace::TraceKind;

fn lines(topo: &Topology) -> Vec<String> {
    topo.trace.lines().collect()
}

fn strings(lines: &[&[&str]]) -> Vec<Vec<String>> {
    lines
        .iter()
        .map(|l| l.iter().map(|f| f.to_string()).collect())
        .collect()
}

fn payloads<'a>(topo: &'a Topology, pick: impl Fn(&'a TraceKind) -> Option<&'a str>) -> Vec<&'a str> {
    topo.trace.events().iter().filter_map(|e| pick(&e.kind)).collect()
}

#[test]
fn same_subnet_ping_trace() {
    let mut topo = same_subnet();
    topo.send_message_by_name("hi", "A", "B").unwrap();

    assert_eq!(
        lines(&topo),
        vec![
            r"A box A : ETH (src=AA dst=FF:FF:FF:FF:FF:FF) \n ARP - Who has 10.0.0.2? Tell 10.0.0.1;",
            r"B => A : ETH (src=BB dst=AA) \n ARP - 10.0.0.2 is at BB;",
            r"A => B : ETH (src=AA dst=BB) \n IP (src=10.0.0.1 dst=10.0.0.2 ttl=8 mf=0 off=0) \n ICMP - Echo request (data=hi);",
            r"B rbox B : Received hi;",
            r"B => A : ETH (src=BB dst=AA) \n IP (src=10.0.0.2 dst=10.0.0.1 ttl=8 mf=0 off=0) \n ICMP - Echo reply (data=hi);",
            r"A rbox A : Reply received (data=hi);",
        ]
    );
}

#[test]
fn one_router_ping_trace() {
    let mut topo = one_router();
    topo.send_message_by_name("x", "A", "C").unwrap();

    assert_eq!(
        lines(&topo),
        vec![
            r"A box A : ETH (src=AA dst=FF:FF:FF:FF:FF:FF) \n ARP - Who has 10.0.0.254? Tell 10.0.0.1;",
            r"R => A : ETH (src=R0 dst=AA) \n ARP - 10.0.0.254 is at R0;",
            r"A => R : ETH (src=AA dst=R0) \n IP (src=10.0.0.1 dst=10.0.1.1 ttl=8 mf=0 off=0) \n ICMP - Echo request (data=x);",
            r"R box R : ETH (src=R1 dst=FF:FF:FF:FF:FF:FF) \n ARP - Who has 10.0.1.1? Tell 10.0.1.254;",
            r"C => R : ETH (src=CC dst=R1) \n ARP - 10.0.1.1 is at CC;",
            r"R => C : ETH (src=R1 dst=CC) \n IP (src=10.0.0.1 dst=10.0.1.1 ttl=7 mf=0 off=0) \n ICMP - Echo request (data=x);",
            r"C rbox C : Received x;",
            r"C => R : ETH (src=CC dst=R1) \n IP (src=10.0.1.1 dst=10.0.0.1 ttl=8 mf=0 off=0) \n ICMP - Echo reply (data=x);",
            r"R => A : ETH (src=R0 dst=AA) \n IP (src=10.0.1.1 dst=10.0.0.1 ttl=7 mf=0 off=0) \n ICMP - Echo reply (data=x);",
            r"A rbox A : Reply received (data=x);",
        ]
    );
}

#[test]
fn names_are_case_insensitive() {
    let mut topo = one_router();
    topo.send_message_by_name("x", "a", "c").unwrap();
    assert_eq!(topo.stats.delivered_msgs, 1);
    assert_eq!(topo.stats.replies_received, 1);
}

#[test]
fn addresses_are_preserved_end_to_end() {
    let mut topo = router_chain(3);
    topo.send_message_by_name("abc", "A", "Z").unwrap();

    for ev in topo.trace.events() {
        if let TraceKind::EchoRequest { ip, .. } = &ev.kind {
            assert_eq!(ip.src_ip, "10.0.0.1");
            assert_eq!(ip.dst_ip, "10.0.3.2");
        }
        if let TraceKind::EchoReply { ip, .. } = &ev.kind {
            assert_eq!(ip.src_ip, "10.0.3.2");
            assert_eq!(ip.dst_ip, "10.0.0.1");
        }
    }
}

#[test]
fn ttl_decrements_once_per_router() {
    let mut topo = router_chain(3);
    topo.send_message_by_name("abc", "A", "Z").unwrap();

    let ttls: Vec<u8> = topo
        .trace
        .events()
        .iter()
        .filter_map(|e| match &e.kind {
            TraceKind::EchoRequest { ip, .. } => Some(ip.ttl),
            _ => None,
        })
        .collect();
    assert_eq!(ttls, vec![8, 7, 6, 5]);
}

#[test]
fn message_within_ttl_is_delivered() {
    let mut topo = router_chain(7);
    topo.send_message_by_name("far", "A", "Z").unwrap();

    assert_eq!(topo.stats.delivered_msgs, 1);
    assert_eq!(topo.stats.replies_received, 1);
    assert_eq!(topo.stats.time_exceeded, 0);
    assert_eq!(
        lines(&topo).last().map(String::as_str),
        Some("A rbox A : Reply received (data=far);")
    );
}

#[test]
fn message_beyond_ttl_is_reported_by_the_last_router() {
    let mut topo = router_chain(8);
    topo.send_message_by_name("far", "A", "Z").unwrap();

    assert_eq!(topo.stats.delivered_msgs, 0);
    assert_eq!(topo.stats.replies_received, 0);
    assert_eq!(topo.stats.echo_requests, 8);
    assert_eq!(topo.stats.time_exceeded, 8);
    assert_eq!(topo.stats.time_exceeded_received, 1);

    let all = lines(&topo);
    assert!(all.contains(
        &r"R8 => R7 : ETH (src=R8P0 dst=R7P1) \n IP (src=10.0.7.254 dst=10.0.0.1 ttl=8 mf=0 off=0) \n ICMP - Time Exceeded;"
            .to_string()
    ));
    assert_eq!(
        all.last().map(String::as_str),
        Some("A rbox A : Time exceeded reported by R8;")
    );
}

#[test]
fn first_router_reports_when_ttl_is_one() {
    let mut topo = one_router();
    topo.set_config(SimConfig { initial_ttl: 1 });
    topo.send_message_by_name("x", "A", "C").unwrap();

    assert_eq!(
        lines(&topo)[5..],
        [
            r"R => A : ETH (src=R0 dst=AA) \n IP (src=10.0.0.254 dst=10.0.0.1 ttl=1 mf=0 off=0) \n ICMP - Time Exceeded;",
            r"A rbox A : Time exceeded reported by R;",
        ]
    );
    assert_eq!(topo.trace.len(), 7);
}

#[test]
fn node_sending_with_zero_ttl_discards() {
    let mut topo = same_subnet();
    topo.set_config(SimConfig { initial_ttl: 0 });
    topo.send_message_by_name("hi", "A", "B").unwrap();

    assert_eq!(topo.stats.delivered_msgs, 0);
    assert_eq!(topo.stats.discarded, 1);
    assert!(matches!(
        topo.trace.events().last().map(|e| &e.kind),
        Some(TraceKind::Discarded { at, .. }) if at == "A"
    ));
}

#[test]
fn every_hop_refragments_to_its_mtu() {
    let mut topo = one_router_with_mtus(10, 4, 3, 6);
    topo.send_message_by_name("HELLO WORLD", "A", "C").unwrap();

    let requests = payloads(&topo, |k| match k {
        TraceKind::EchoRequest { ip, .. } => ip.data.as_deref(),
        _ => None,
    });
    assert_eq!(requests, vec!["HELL", "O WO", "RLD", "HEL", "LO ", "WOR", "LD"]);

    let replies = payloads(&topo, |k| match k {
        TraceKind::EchoReply { ip, .. } => ip.data.as_deref(),
        _ => None,
    });
    assert_eq!(replies, vec!["HELLO ", "WORLD", "HELL", "O WO", "RLD"]);

    let offsets: Vec<(usize, bool)> = topo
        .trace
        .events()
        .iter()
        .filter_map(|e| match &e.kind {
            TraceKind::EchoRequest { frame, ip } if frame.src_name == "R" => Some((ip.off, ip.mf)),
            _ => None,
        })
        .collect();
    assert_eq!(offsets, vec![(0, true), (3, true), (6, true), (9, false)]);

    let delivered = payloads(&topo, |k| match k {
        TraceKind::Delivered { payload, .. } => Some(payload.as_str()),
        _ => None,
    });
    assert_eq!(delivered, vec!["HELLO WORLD"]);

    assert_eq!(
        topo.stats,
        Stats {
            arp_requests: 2,
            arp_replies: 2,
            echo_requests: 7,
            echo_replies: 5,
            delivered_msgs: 1,
            replies_received: 1,
            ..Stats::default()
        }
    );
}

#[test]
fn missing_route_aborts_the_run() {
    let nodes = strings(&[
        &["A", "AA", "10.0.0.1/24", "5", "10.0.0.254"],
        &["C", "CC", "10.0.1.1/24", "5", "10.0.1.254"],
    ]);
    let routers = strings(&[&[
        "R",
        "2",
        "R0",
        "10.0.0.254/24",
        "5",
        "R1",
        "10.0.1.254/24",
        "5",
    ]]);
    let routes = strings(&[&["R", "10.0.0.0/24", "0.0.0.0/0", "0"]]);
    let mut topo = build_topology(&nodes, &routers, &routes).unwrap();

    let err = topo.send_message_by_name("x", "A", "C").unwrap_err();
    match err {
        DeliveryError::NoRoute(e) => {
            assert_eq!(e.from, "R");
            assert_eq!(e.destination, addr("10.0.1.1/24"));
        }
        other => panic!("expected NoRoute, got {other:?}"),
    }
    // What happened before the failure is kept.
    assert_eq!(topo.trace.len(), 3);
}

#[test]
fn node_without_gateway_cannot_leave_its_subnet() {
    let nodes = strings(&[
        &["A", "AA", "10.0.0.1/24", "5", "0.0.0.0"],
        &["B", "BB", "10.0.1.1/24", "5", "0.0.0.0"],
    ]);
    let mut topo = build_topology(&nodes, &[], &[]).unwrap();

    let err = topo.send_message_by_name("x", "A", "B").unwrap_err();
    assert!(matches!(&err, DeliveryError::NoRoute(e) if e.from == "A"));
    assert!(topo.trace.is_empty());
}

#[test]
fn unknown_endpoints_are_rejected() {
    let mut topo = one_router();

    let err = topo.send_message_by_name("x", "A", "Q").unwrap_err();
    assert!(matches!(&err, DeliveryError::UnknownEndpoint(e) if e.endpoint == "Q"));

    // Routers are not message endpoints.
    let err = topo.send_message_by_name("x", "A", "R").unwrap_err();
    assert!(matches!(err, DeliveryError::UnknownEndpoint(_)));

    // Address lookup is a full match, prefix included.
    let err = topo
        .send_message("x", &addr("10.0.0.1/24"), &addr("10.0.1.1/16"))
        .unwrap_err();
    assert!(matches!(err, DeliveryError::UnknownEndpoint(_)));
    assert!(topo.trace.is_empty());
}

#[test]
fn send_message_by_address() {
    let mut topo = one_router();
    topo.send_message("ok", &addr("10.0.1.1/24"), &addr("10.0.0.1/24"))
        .unwrap();
    assert_eq!(
        lines(&topo)[0],
        r"C box C : ETH (src=CC dst=FF:FF:FF:FF:FF:FF) \n ARP - Who has 10.0.1.254? Tell 10.0.1.1;"
    );
    assert_eq!(topo.stats.replies_received, 1);
}

#[test]
fn reset_trace_keeps_learned_mappings() {
    let mut topo = same_subnet();
    topo.send_message_by_name("one", "A", "B").unwrap();
    topo.reset_trace();
    assert!(topo.trace.is_empty());
    assert_eq!(topo.stats, Stats::default());

    topo.send_message_by_name("two", "B", "A").unwrap();
    assert_eq!(topo.trace.count(TraceKind::is_arp), 0);
    assert_eq!(topo.trace.len(), 4);
}

#[test]
fn expired_time_exceeded_notice_is_discarded() {
    // Each router sends everything to the other, so nothing ever arrives.
    let nodes = strings(&[
        &["A", "AA", "10.0.0.1/24", "8", "10.0.0.254"],
        &["Z", "ZZ", "10.0.5.2/24", "8", "0.0.0.0"],
    ]);
    let routers = strings(&[
        &["R1", "2", "R1P0", "10.0.0.254/24", "8", "R1P1", "10.0.9.1/24", "8"],
        &["R2", "1", "R2P0", "10.0.9.2/24", "8"],
    ]);
    let routes = strings(&[
        &["R1", "0.0.0.0/0", "10.0.9.2", "1"],
        &["R2", "0.0.0.0/0", "10.0.9.1", "0"],
    ]);
    let mut topo = build_topology(&nodes, &routers, &routes).unwrap();

    topo.send_message_by_name("x", "A", "Z").unwrap();

    assert_eq!(topo.stats.echo_requests, 8);
    assert_eq!(topo.stats.time_exceeded, 8);
    assert_eq!(topo.stats.discarded, 1);
    assert_eq!(topo.stats.delivered_msgs, 0);
    assert_eq!(topo.stats.time_exceeded_received, 0);

    let last = topo.trace.events().last().map(|e| &e.kind);
    assert_eq!(
        last,
        Some(&TraceKind::Discarded {
            at: "R2".to_string(),
            reason: "time exceeded notice expired".to_string(),
        })
    );
    assert_eq!(
        lines(&topo).last().map(String::as_str),
        Some("R2 rbox R2 : Discarded (time exceeded notice expired);")
    );
}

#[test]
fn reply_lost_in_a_loop_is_reported_to_the_replier() {
    // R2 has no route back to A's subnet, so the reply bounces between the
    // routers until it expires at R2.
    let nodes = strings(&[
        &["A", "AA", "10.0.0.1/24", "8", "10.0.0.254"],
        &["Z", "ZZ", "10.0.1.2/24", "8", "10.0.1.1"],
    ]);
    let routers = strings(&[
        &["R1", "2", "R1P0", "10.0.9.1/24", "8", "R1P1", "10.0.1.1/24", "8"],
        &["R2", "2", "R2P0", "10.0.0.254/24", "8", "R2P1", "10.0.9.2/24", "8"],
    ]);
    let routes = strings(&[
        &["R1", "10.0.1.0/24", "0.0.0.0/0", "1"],
        &["R1", "0.0.0.0/0", "10.0.9.2", "0"],
        &["R2", "10.0.1.0/24", "10.0.9.1", "1"],
        &["R2", "0.0.0.0/0", "10.0.9.1", "1"],
    ]);
    let mut topo = build_topology(&nodes, &routers, &routes).unwrap();

    topo.send_message_by_name("x", "A", "Z").unwrap();

    assert_eq!(topo.stats.echo_requests, 3);
    assert_eq!(topo.stats.delivered_msgs, 1);
    assert_eq!(topo.stats.echo_replies, 8);
    assert_eq!(topo.stats.replies_received, 0);
    assert_eq!(topo.stats.time_exceeded, 2);
    assert_eq!(topo.stats.time_exceeded_received, 1);
    assert_eq!(topo.stats.discarded, 0);

    let reported: Vec<(&str, &str)> = topo
        .trace
        .events()
        .iter()
        .filter_map(|e| match &e.kind {
            TraceKind::TimeExceededReceived { node, reporter } => Some((node.as_str(), reporter.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(reported, vec![("Z", "R2")]);
    assert_eq!(
        lines(&topo).last().map(String::as_str),
        Some("Z rbox Z : Time exceeded reported by R2;")
    );
}
