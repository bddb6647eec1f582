//! 拓扑构建
//!
//! 由分好字段的描述行构建拓扑，并做构建期校验。

use std::collections::HashSet;
use std::net::Ipv4Addr;

use tracing::{debug, info};

use crate::error::{Section, TopologyFormatError};
use crate::net::{Address, HwAddr, NetworkInterface, RoutingEntry, SimConfig, Topology};

/// 使用默认 [`SimConfig`] 构建拓扑
///
/// 每行是一条逗号分隔的记录：
/// - 节点：`name,mac,address/prefix,mtu,gateway`
/// - 路由器：`name,portCount,mac0,address0/prefix0,mtu0,...`
/// - 路由：`router,destination/prefix,nextHop/prefix,port`
pub fn build_topology<S: AsRef<str>>(
    node_lines: &[Vec<S>],
    router_lines: &[Vec<S>],
    route_lines: &[Vec<S>],
) -> Result<Topology, TopologyFormatError> {
    build_topology_with_config(node_lines, router_lines, route_lines, SimConfig::default())
}

/// 两遍构建：先节点和路由器，再路由表项，最后检查网关和下一跳等交叉引用。
pub fn build_topology_with_config<S: AsRef<str>>(
    node_lines: &[Vec<S>],
    router_lines: &[Vec<S>],
    route_lines: &[Vec<S>],
    config: SimConfig,
) -> Result<Topology, TopologyFormatError> {
    let mut topo = Topology::with_config(config);
    let mut names = HashSet::new();
    let mut hws = HashSet::new();
    let mut addrs = HashSet::new();

    for (i, line) in node_lines.iter().enumerate() {
        let err = |reason: &str| TopologyFormatError::new(Section::Node, i, reason);
        let f = fields(line);
        if f.len() != 5 {
            return Err(err(&format!("expected 5 fields, got {}", f.len())));
        }
        let name = f[0].to_ascii_uppercase();
        if !names.insert(name.clone()) {
            return Err(err(&format!("duplicate component name {name}")));
        }
        let iface = interface(Section::Node, i, f[1], f[2], f[3], &mut hws, &mut addrs)?;
        let gateway = address(Section::Node, i, f[4])?;
        debug!(node = %name, address = %iface.address, gateway = %gateway, "声明节点");
        topo.add_node(name, iface, gateway);
    }

    for (i, line) in router_lines.iter().enumerate() {
        let err = |reason: &str| TopologyFormatError::new(Section::Router, i, reason);
        let f = fields(line);
        if f.len() < 2 {
            return Err(err("expected name and port count"));
        }
        let name = f[0].to_ascii_uppercase();
        let ports = f[1]
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| err(&format!("invalid port count `{}`", f[1])))?;
        let expected = 2 + 3 * ports;
        if f.len() != expected {
            return Err(err(&format!("expected {expected} fields for {ports} ports, got {}", f.len())));
        }
        if !names.insert(name.clone()) {
            return Err(err(&format!("duplicate component name {name}")));
        }
        let ifaces = f[2..]
            .chunks(3)
            .map(|c| interface(Section::Router, i, c[0], c[1], c[2], &mut hws, &mut addrs))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(router = %name, ports, "声明路由器");
        topo.add_router(name, ifaces);
    }

    for (i, line) in route_lines.iter().enumerate() {
        let err = |reason: &str| TopologyFormatError::new(Section::RouterTable, i, reason);
        let f = fields(line);
        if f.len() != 4 {
            return Err(err(&format!("expected 4 fields, got {}", f.len())));
        }
        let destination = address(Section::RouterTable, i, f[1])?;
        let next_hop = address(Section::RouterTable, i, f[2])?;
        let port = f[3]
            .parse::<usize>()
            .map_err(|_| err(&format!("invalid port number `{}`", f[3])))?;

        let r = topo
            .add_route(f[0], RoutingEntry::new(destination, next_hop, port))
            .map_err(|_| err(&format!("unknown router {}", f[0])))?;
        let router = topo.router(r);
        if router.port(port).is_none() {
            return Err(err(&format!("{} has no port {port}", router.name())));
        }
        if !next_hop.is_on_link() && topo.lookup_by_numeric(&next_hop).is_none() {
            return Err(err(&format!("next hop {} is not a router port", next_hop.ip())));
        }
    }

    for (i, node) in topo.nodes().iter().enumerate() {
        let gateway = node.gateway();
        if !gateway.is_unspecified() && topo.lookup_by_numeric(gateway).is_none() {
            return Err(TopologyFormatError::new(
                Section::Node,
                i,
                format!("gateway {} of {} is not a router port", gateway.ip(), node.name()),
            ));
        }
    }

    info!(
        nodes = topo.nodes().len(),
        routers = topo.routers().len(),
        routes = route_lines.len(),
        "🏗️  拓扑构建完成"
    );
    Ok(topo)
}

fn fields<S: AsRef<str>>(line: &[S]) -> Vec<&str> {
    line.iter().map(|s| s.as_ref().trim()).collect()
}

fn address(section: Section, index: usize, literal: &str) -> Result<Address, TopologyFormatError> {
    literal
        .parse()
        .map_err(|e| TopologyFormatError::address(section, index, e))
}

fn interface(
    section: Section,
    index: usize,
    mac: &str,
    addr: &str,
    mtu: &str,
    seen_hw: &mut HashSet<String>,
    seen_addr: &mut HashSet<Ipv4Addr>,
) -> Result<NetworkInterface, TopologyFormatError> {
    let mac = mac.to_ascii_uppercase();
    if mac.is_empty() {
        return Err(TopologyFormatError::new(section, index, "empty hardware id"));
    }
    let hw = HwAddr::new(mac.clone());
    // 广播值保留给 ARP 请求
    if hw.is_broadcast() {
        return Err(TopologyFormatError::new(
            section,
            index,
            "reserved broadcast hardware id",
        ));
    }
    if !seen_hw.insert(mac.clone()) {
        return Err(TopologyFormatError::new(
            section,
            index,
            format!("duplicate hardware id {mac}"),
        ));
    }
    let address = address(section, index, addr)?;
    // 按数值比较，前缀不同也算重复
    if !seen_addr.insert(address.ip()) {
        return Err(TopologyFormatError::new(
            section,
            index,
            format!("duplicate interface address {address}"),
        ));
    }
    let mtu = mtu
        .parse::<usize>()
        .ok()
        .filter(|m| *m >= 1)
        .ok_or_else(|| TopologyFormatError::new(section, index, format!("invalid mtu `{mtu}`")))?;
    Ok(NetworkInterface::new(address, hw, mtu))
}
