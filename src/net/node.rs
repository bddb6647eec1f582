//! 主机节点
//!
//! 节点拥有一个接口和一个默认网关，是 echo 流量的起点和终点。

use tracing::{debug, info};

use super::address::Address;
use super::arp::{ArpCache, ArpResponder};
use super::id::{ComponentId, NodeId};
use super::iface::NetworkInterface;
use super::network::Topology;
use super::packet::{Endpoint, Fragments, Packet, PacketKind};
use crate::error::{DeliveryError, InvalidMtuError, NoRouteError, UnknownEndpointError};
use crate::trace::TraceKind;

/// 主机
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    iface: NetworkInterface,
    gateway: Address,
    arp: ArpCache,
}

impl Node {
    /// 创建新主机；`gateway` 为 `0.0.0.0` 表示没有默认网关
    pub fn new(id: NodeId, name: impl Into<String>, iface: NetworkInterface, gateway: Address) -> Self {
        Self {
            id,
            name: name.into(),
            iface,
            gateway,
            arp: ArpCache::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn iface(&self) -> &NetworkInterface {
        &self.iface
    }

    pub fn gateway(&self) -> &Address {
        &self.gateway
    }

    pub fn arp(&self) -> &ArpCache {
        &self.arp
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.name.clone(), self.iface.hw.clone(), self.iface.address)
    }

    /// `dest` 是否在本节点子网内（用本节点的前缀判断）
    pub fn is_same_network(&self, dest: &Address) -> bool {
        self.iface.address.is_same_network(dest)
    }

    /// 到达的 echo request 携带的完整消息
    pub fn receive_echo_request(&self, fragments: &Fragments) -> Packet {
        fragments.reassemble()
    }

    /// 对 `fragments` 的 echo reply：交换收发端，重置 ttl，按 `mtu` 切分
    pub fn reply_to_echo_request(
        &self,
        fragments: &Fragments,
        mtu: usize,
        ttl: u8,
    ) -> Result<Fragments, InvalidMtuError> {
        let request = fragments.reassemble();
        Packet::new(
            PacketKind::EchoReply,
            self.endpoint(),
            request.src,
            request.payload,
            ttl,
        )
        .fragment(mtu)
    }
}

impl ArpResponder for Node {
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
        self.iface.address.same_numeric(address).then_some(&self.iface)
    }
}

impl Topology {
    /// 从节点 `n` 向 `dest` 发出 echo request。
    ///
    /// 同网段目的地直接发送；否则发给默认网关端口，ARP 解析的也是该端口。
    #[tracing::instrument(skip(self, message, dest_iface), fields(node = %self.node(n).name(), dest_addr = %dest_iface.address))]
    pub(crate) fn node_send_message(
        &mut self,
        n: NodeId,
        message: &str,
        dest: ComponentId,
        dest_iface: &NetworkInterface,
    ) -> Result<(), DeliveryError> {
        let node = self.node(n);
        let own = node.iface().clone();
        let src = node.endpoint();

        let (egress, next_name, arp_target) = if node.is_same_network(&dest_iface.address) {
            debug!("目的地在本网段");
            (
                dest_iface.clone(),
                self.name_of(dest).to_string(),
                dest_iface.address,
            )
        } else {
            let no_route = || NoRouteError {
                from: node.name().to_string(),
                destination: dest_iface.address,
            };
            let gw = self.default_gateway(n).ok_or_else(no_route)?;
            let router = self.router(gw);
            let port = router.port_by_address(node.gateway()).ok_or_else(no_route)?;
            debug!(gateway = router.name(), port = port.number, "目的地不在本网段，交给网关");
            (
                NetworkInterface::new(dest_iface.address, port.iface.hw.clone(), port.iface.mtu),
                router.name().to_string(),
                port.iface.address,
            )
        };

        let hw = self.resolve_arp(ComponentId::Node(n), &own, &arp_target)?;
        let request = Packet::new(
            PacketKind::EchoRequest,
            src,
            Endpoint::new(next_name, hw, dest_iface.address),
            message,
            self.config().initial_ttl,
        );
        let fragments = request.fragment(egress.mtu)?;
        self.deliver_echo_request(ComponentId::Node(n), &own, &egress, fragments)
    }

    /// echo request 到达终点，总是要求回复
    pub(crate) fn node_receive_echo_request(&mut self, n: NodeId, fragments: &Fragments) -> bool {
        let node = self.node(n);
        let msg = node.receive_echo_request(fragments);
        let name = node.name().to_string();
        info!(node = %name, payload = %msg.payload, "✅ 消息已送达");
        self.record(TraceKind::Delivered {
            node: name,
            payload: msg.payload,
        });
        true
    }

    pub(crate) fn node_receive_echo_reply(&mut self, n: NodeId, fragments: &Fragments) {
        let reply = fragments.reassemble();
        let name = self.node(n).name().to_string();
        info!(node = %name, from = %reply.src.address, "📨 收到 echo reply");
        self.record(TraceKind::ReplyReceived {
            node: name,
            payload: reply.payload,
        });
    }

    pub(crate) fn node_receive_time_exceeded(&mut self, n: NodeId, fragments: &Fragments) {
        let notice = fragments.reassemble();
        let reporter = self
            .lookup_by_numeric(&notice.src.address)
            .map(|(r, _)| self.router(r).name().to_string())
            .unwrap_or_else(|| notice.src.address.ip().to_string());
        let name = self.node(n).name().to_string();
        info!(node = %name, reporter = %reporter, "收到 time exceeded 通知");
        self.record(TraceKind::TimeExceededReceived {
            node: name,
            reporter,
        });
    }

    /// 按名字查找节点；名字不存在或属于路由器时失败
    pub(crate) fn node_by_name(&self, name: &str) -> Result<NodeId, UnknownEndpointError> {
        match self.lookup_by_name(name) {
            Some(ComponentId::Node(n)) => Ok(n),
            Some(ComponentId::Router(_)) | None => Err(UnknownEndpointError::new(name)),
        }
    }
}
