//! 路由器
//!
//! 路由器逐跳转发分片：重组收到的分片，选路由表项，用 ARP 解析下一跳，改写链路层
//! 收发端（IP 地址不变），TTL 减一，再按出口 MTU 重新切分。

use tracing::{debug, trace};

use super::address::Address;
use super::arp::{ArpCache, ArpResponder};
use super::id::{ComponentId, HwAddr, RouterId};
use super::iface::{NetworkInterface, Port};
use super::network::Topology;
use super::packet::{Endpoint, Fragments, Packet, PacketKind};
use super::routing::{RoutingEntry, RoutingTable};
use crate::error::{DeliveryError, NoRouteError, UnknownEndpointError};

#[derive(Debug, Clone)]
pub struct Router {
    id: RouterId,
    name: String,
    ports: Vec<Port>,
    table: RoutingTable,
    arp: ArpCache,
}

impl Router {
    /// 创建新路由器，端口按给定顺序编号
    pub fn new(id: RouterId, name: impl Into<String>, ifaces: Vec<NetworkInterface>) -> Self {
        Self {
            id,
            name: name.into(),
            ports: ifaces
                .into_iter()
                .enumerate()
                .map(|(i, iface)| Port::new(i, iface))
                .collect(),
            table: RoutingTable::new(),
            arp: ArpCache::default(),
        }
    }

    pub fn id(&self) -> RouterId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn port(&self, number: usize) -> Option<&Port> {
        self.ports.iter().find(|p| p.number == number)
    }

    /// 地址数值等于 `address` 的端口
    pub fn port_by_address(&self, address: &Address) -> Option<&Port> {
        self.ports
            .iter()
            .find(|p| p.iface.address.same_numeric(address))
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn arp(&self) -> &ArpCache {
        &self.arp
    }

    pub(crate) fn add_route(&mut self, entry: RoutingEntry) {
        self.table.push(entry);
    }

    /// 第一条覆盖 `dest` 的路由表项
    pub fn route(&self, dest: &Address) -> Result<&RoutingEntry, NoRouteError> {
        self.table.lookup(dest).ok_or_else(|| NoRouteError {
            from: self.name.clone(),
            destination: *dest,
        })
    }
}

impl ArpResponder for Router {
    fn name(&self) -> &str {
        &self.name
    }

    fn arp_cache(&self) -> &ArpCache {
        &self.arp
    }

    fn arp_cache_mut(&mut self) -> &mut ArpCache {
        &mut self.arp
    }

    fn interface_for(&self, address: &Address) -> Option<&NetworkInterface> {
        self.port_by_address(address).map(|p| &p.iface)
    }
}

/// 一次转发决策解析出的下一跳
#[derive(Debug, Clone)]
pub(crate) struct Hop {
    pub egress: Port,
    pub next_name: String,
    pub next_iface: NetworkInterface,
    /// 通过 ARP 学到的硬件地址
    pub next_hw: HwAddr,
}

impl Topology {
    /// 查路由表并解析从路由器 `r` 到 `toward` 的下一跳
    #[tracing::instrument(skip(self), fields(router = %self.router(r).name()))]
    pub(crate) fn next_hop(&mut self, r: RouterId, toward: &Address) -> Result<Hop, DeliveryError> {
        let router = self.router(r);
        let entry = router.route(toward)?;
        let egress = router
            .port(entry.port)
            .cloned()
            .ok_or_else(|| UnknownEndpointError::new(format!("{}:port{}", router.name(), entry.port)))?;

        let (next, next_iface) = if entry.is_on_link() {
            let (id, iface) = self
                .lookup_by_address(toward)
                .ok_or_else(|| UnknownEndpointError::new(*toward))?;
            (id, iface.clone())
        } else {
            let (id, port) = self
                .lookup_by_numeric(&entry.next_hop)
                .ok_or_else(|| UnknownEndpointError::new(entry.next_hop))?;
            (ComponentId::Router(id), port.iface.clone())
        };
        let next_name = self.name_of(next).to_string();
        debug!(
            egress = egress.number,
            next = %next_name,
            on_link = entry.is_on_link(),
            "选定路由"
        );

        let next_hw = self.resolve_arp(ComponentId::Router(r), &egress.iface, &next_iface.address)?;
        Ok(Hop {
            egress,
            next_name,
            next_iface,
            next_hw,
        })
    }

    /// 把分片向目的地址转发一跳。
    ///
    /// 源端改为本路由器出口端口，目的端改为解析出的下一跳；地址、类型和载荷不变，
    /// ttl 减一，按出口 MTU 重新切分。
    fn relay(&mut self, r: RouterId, fragments: &Fragments) -> Result<(Hop, Fragments), DeliveryError> {
        let pkt = fragments.reassemble();
        let hop = self.next_hop(r, &pkt.dst.address)?;
        let out = Packet {
            src: Endpoint::new(self.router(r).name(), hop.egress.iface.hw.clone(), pkt.src.address),
            dst: Endpoint::new(hop.next_name.clone(), hop.next_hw.clone(), pkt.dst.address),
            ttl: pkt.ttl.saturating_sub(1),
            ..pkt
        };
        trace!(ttl = out.ttl, mtu = hop.egress.iface.mtu, kind = %out.kind, "转发");
        let cut = out.fragment(hop.egress.iface.mtu)?;
        Ok((hop, cut))
    }

    /// 转发 echo request；路由器自己从不回复
    pub(crate) fn router_receive_echo_request(
        &mut self,
        r: RouterId,
        fragments: Fragments,
    ) -> Result<(), DeliveryError> {
        let (hop, out) = self.relay(r, &fragments)?;
        self.deliver_echo_request(ComponentId::Router(r), &hop.egress.iface, &hop.next_iface, out)
    }

    /// 把 echo reply 转发回原请求方
    pub(crate) fn router_receive_echo_reply(
        &mut self,
        r: RouterId,
        fragments: Fragments,
    ) -> Result<(), DeliveryError> {
        let (_, out) = self.relay(r, &fragments)?;
        self.deliver_echo_reply(ComponentId::Router(r), out)
    }

    /// 把 time exceeded 通知转发给目标节点
    pub(crate) fn router_receive_time_exceeded(
        &mut self,
        r: RouterId,
        fragments: Fragments,
    ) -> Result<(), DeliveryError> {
        let (_, out) = self.relay(r, &fragments)?;
        self.deliver_time_exceeded(r, out)
    }

    /// 为 `fragments` 生成 time exceeded 通知，发回其源地址。
    ///
    /// 本身已是 time exceeded 的分片原样返回。
    pub(crate) fn reply_with_time_exceeded(
        &mut self,
        r: RouterId,
        fragments: Fragments,
    ) -> Result<Fragments, DeliveryError> {
        if fragments.kind() == PacketKind::TimeExceeded {
            return Ok(fragments);
        }

        let expired = fragments.reassemble();
        let hop = self.next_hop(r, &expired.src.address)?;
        let notice = Packet::new(
            PacketKind::TimeExceeded,
            Endpoint::new(
                self.router(r).name(),
                hop.egress.iface.hw.clone(),
                hop.egress.iface.address,
            ),
            Endpoint::new(hop.next_name, hop.next_hw, expired.src.address),
            expired.payload,
            self.config().initial_ttl,
        );
        debug!(router = %self.router(r).name(), to = %expired.src.address, "⏱️  TTL 耗尽，上报");
        Ok(notice.fragment(hop.egress.iface.mtu)?)
    }
}
