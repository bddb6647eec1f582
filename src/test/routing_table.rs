use crate::net::{Address, HwAddr, RoutingEntry, RoutingTable};
use crate::test::fixtures::addr;
use crate::topo::build_topology;

fn strings(lines: &[&[&str]]) -> Vec<Vec<String>> {
    lines
        .iter()
        .map(|l| l.iter().map(|f| f.to_string()).collect())
        .collect()
}

#[test]
fn lookup_returns_first_covering_entry() {
    let mut table = RoutingTable::new();
    table.push(RoutingEntry::new(addr("10.0.0.0/16"), Address::ON_LINK, 2));
    table.push(RoutingEntry::new(addr("10.0.1.0/24"), Address::ON_LINK, 1));

    // No longest-prefix tie-break.
    assert_eq!(table.lookup(&addr("10.0.1.1")).unwrap().port, 2);
    assert!(table.lookup(&addr("10.1.0.1")).is_none());
    assert_eq!(table.len(), 2);
}

#[test]
fn default_route_catches_everything() {
    let mut table = RoutingTable::new();
    table.push(RoutingEntry::new(addr("192.168.0.0/24"), Address::ON_LINK, 0));
    table.push(RoutingEntry::new(addr("0.0.0.0/0"), addr("192.168.0.1"), 1));

    assert_eq!(table.lookup(&addr("192.168.0.9")).unwrap().port, 0);
    let fallback = table.lookup(&addr("8.8.8.8")).unwrap();
    assert_eq!(fallback.port, 1);
    assert!(!fallback.is_on_link());
}

#[test]
fn empty_table_matches_nothing() {
    let table = RoutingTable::default();
    assert!(table.is_empty());
    assert!(table.lookup(&addr("10.0.0.1")).is_none());
}

fn three_port_router(routes: &[&[&str]]) -> crate::net::Topology {
    let nodes = strings(&[
        &["A", "AA", "10.0.0.1/24", "8", "10.0.0.254"],
        &["C", "CC", "10.0.1.1/24", "8", "10.0.1.254"],
    ]);
    let routers = strings(&[&[
        "R",
        "3",
        "R0",
        "10.0.0.254/24",
        "8",
        "R1",
        "10.0.1.254/24",
        "8",
        "R2",
        "10.0.2.254/24",
        "8",
    ]]);
    build_topology(&nodes, &routers, &strings(routes)).unwrap()
}

fn egress_toward_c(topo: &crate::net::Topology) -> String {
    topo.trace
        .events()
        .iter()
        .find_map(|ev| match &ev.kind {
            crate::trace::TraceKind::EchoRequest { frame, .. } if frame.dst_name == "C" => {
                Some(frame.src_hw.clone())
            }
            _ => None,
        })
        .expect("echo request reached C")
}

#[test]
fn router_forwards_on_the_first_matching_entry() {
    let mut wide_first = three_port_router(&[
        &["R", "10.0.0.0/24", "0.0.0.0/0", "0"],
        &["R", "10.0.0.0/16", "0.0.0.0/0", "2"],
        &["R", "10.0.1.0/24", "0.0.0.0/0", "1"],
    ]);
    wide_first.send_message_by_name("m", "A", "C").unwrap();
    assert_eq!(egress_toward_c(&wide_first), HwAddr::new("R2").to_string());

    let mut narrow_first = three_port_router(&[
        &["R", "10.0.0.0/24", "0.0.0.0/0", "0"],
        &["R", "10.0.1.0/24", "0.0.0.0/0", "1"],
        &["R", "10.0.0.0/16", "0.0.0.0/0", "2"],
    ]);
    narrow_first.send_message_by_name("m", "A", "C").unwrap();
    assert_eq!(egress_toward_c(&narrow_first), "R1");
}
