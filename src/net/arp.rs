//! ARP 解析
//!
//! 每个节点和路由器各有一个 [`ArpCache`]。未命中时在拓扑中走一次广播请求加单播
//! 回复的交换；命中则直接返回。表项永不过期。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use tracing::{debug, trace};

use super::address::Address;
use super::id::{ComponentId, HwAddr};
use super::iface::NetworkInterface;
use super::network::Topology;
use super::packet::{Endpoint, Packet, PacketKind};
use crate::error::{DeliveryError, UnknownEndpointError};
use crate::trace::TraceKind;

/// 地址到硬件地址的映射，以地址数值为键
#[derive(Debug, Default, Clone)]
pub struct ArpCache {
    entries: HashMap<Ipv4Addr, HwAddr>,
}

impl ArpCache {
    pub fn lookup(&self, address: &Address) -> Option<&HwAddr> {
        self.entries.get(&address.ip())
    }

    /// 记录 `address -> hw`，已存在则不覆盖。
    /// 返回是否新增了表项。
    pub fn learn(&mut self, address: &Address, hw: HwAddr) -> bool {
        if self.entries.contains_key(&address.ip()) {
            return false;
        }
        self.entries.insert(address.ip(), hw);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 组件的 ARP 部分：持有缓存，并应答对自身地址的请求
pub trait ArpResponder {
    fn name(&self) -> &str;

    fn arp_cache(&self) -> &ArpCache;

    fn arp_cache_mut(&mut self) -> &mut ArpCache;

    /// 持有 `address` 的接口
    fn interface_for(&self, address: &Address) -> Option<&NetworkInterface>;

    /// 学习请求方的映射
    fn receive_arp_request(&mut self, pkt: &Packet) {
        let learned = self
            .arp_cache_mut()
            .learn(&pkt.src.address, pkt.src.hw.clone());
        trace!(responder = self.name(), learned, sender = %pkt.src.address, "收到 ARP 请求");
    }

    /// 由持有被请求地址的接口回复请求方
    fn reply_to_arp_request(&self, pkt: &Packet) -> Option<Packet> {
        let iface = self.interface_for(&pkt.dst.address)?;
        Some(Packet::new(
            PacketKind::ArpReply,
            Endpoint::new(self.name(), iface.hw.clone(), iface.address),
            pkt.src.clone(),
            "",
            pkt.ttl,
        ))
    }
}

impl Topology {
    fn arp_responder(&self, id: ComponentId) -> &dyn ArpResponder {
        match id {
            ComponentId::Node(n) => self.node(n),
            ComponentId::Router(r) => self.router(r),
        }
    }

    fn arp_responder_mut(&mut self, id: ComponentId) -> &mut dyn ArpResponder {
        match id {
            ComponentId::Node(n) => self.node_mut(n),
            ComponentId::Router(r) => self.router_mut(r),
        }
    }

    /// `requester` 眼中 `target` 的硬件地址；缓存未命中时从 `via` 发起 ARP 交换。
    #[tracing::instrument(skip(self, via), fields(via = %via.address))]
    pub(crate) fn resolve_arp(
        &mut self,
        requester: ComponentId,
        via: &NetworkInterface,
        target: &Address,
    ) -> Result<HwAddr, DeliveryError> {
        if let Some(hw) = self.arp_responder(requester).arp_cache().lookup(target) {
            trace!(hw = %hw, "ARP 缓存命中");
            return Ok(hw.clone());
        }

        debug!("📢 ARP 缓存未命中，广播请求");
        let request = Packet::new(
            PacketKind::ArpRequest,
            Endpoint::new(self.name_of(requester), via.hw.clone(), via.address),
            Endpoint::new("*", HwAddr::broadcast(), *target),
            "",
            self.config().initial_ttl,
        );
        let reply = self.send_arp_request(request)?;
        self.arp_responder_mut(requester)
            .arp_cache_mut()
            .learn(&reply.src.address, reply.src.hw.clone());
        Ok(reply.src.hw)
    }

    /// 把广播 ARP 请求交给被请求地址的持有者，并返回其回复
    pub fn send_arp_request(&mut self, pkt: Packet) -> Result<Packet, DeliveryError> {
        self.record(TraceKind::from_packet(&pkt));

        let (target, _) = self
            .lookup_by_address(&pkt.dst.address)
            .ok_or_else(|| UnknownEndpointError::new(pkt.dst.address))?;
        let responder = self.arp_responder_mut(target);
        responder.receive_arp_request(&pkt);
        let reply = responder
            .reply_to_arp_request(&pkt)
            .ok_or_else(|| UnknownEndpointError::new(pkt.dst.address))?;

        self.record(TraceKind::from_packet(&reply));
        Ok(reply)
    }
}
