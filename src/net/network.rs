//! 网络拓扑管理
//!
//! `Topology` 拥有所有节点和路由器。组件之间不互相持有引用，跨组件访问都通过
//! 下面的查找方法。

use tracing::{debug, trace};

use super::address::Address;
use super::config::SimConfig;
use super::id::{ComponentId, HwAddr, NodeId, RouterId};
use super::iface::{NetworkInterface, Port};
use super::node::Node;
use super::router::Router;
use super::routing::RoutingEntry;
use super::stats::Stats;
use crate::error::UnknownEndpointError;
use crate::trace::{TraceKind, TraceLog};

#[derive(Debug, Default)]
pub struct Topology {
    nodes: Vec<Node>,
    routers: Vec<Router>,
    config: SimConfig,
    pub trace: TraceLog,
    pub stats: Stats,
}

impl Topology {
    pub fn with_config(config: SimConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SimConfig) {
        self.config = config;
    }

    /// 添加主机节点
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        iface: NetworkInterface,
        gateway: Address,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, name, iface, gateway));
        id
    }

    /// 添加路由器，端口按 `ifaces` 顺序编号
    pub fn add_router(&mut self, name: impl Into<String>, ifaces: Vec<NetworkInterface>) -> RouterId {
        let id = RouterId(self.routers.len());
        self.routers.push(Router::new(id, name, ifaces));
        id
    }

    /// 为名为 `router` 的路由器追加路由表项
    pub fn add_route(&mut self, router: &str, entry: RoutingEntry) -> Result<RouterId, UnknownEndpointError> {
        match self.lookup_by_name(router) {
            Some(ComponentId::Router(r)) => {
                self.routers[r.0].add_route(entry);
                Ok(r)
            }
            Some(ComponentId::Node(_)) | None => Err(UnknownEndpointError::new(router)),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn router(&self, id: RouterId) -> &Router {
        &self.routers[id.0]
    }

    pub(crate) fn router_mut(&mut self, id: RouterId) -> &mut Router {
        &mut self.routers[id.0]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn routers(&self) -> &[Router] {
        &self.routers
    }

    pub fn name_of(&self, id: ComponentId) -> &str {
        match id {
            ComponentId::Node(n) => self.node(n).name(),
            ComponentId::Router(r) => self.router(r).name(),
        }
    }

    /// 按组件名查找（不区分大小写）
    pub fn lookup_by_name(&self, name: &str) -> Option<ComponentId> {
        if let Some(n) = self.nodes.iter().find(|n| n.name().eq_ignore_ascii_case(name)) {
            return Some(ComponentId::Node(n.id()));
        }
        self.routers
            .iter()
            .find(|r| r.name().eq_ignore_ascii_case(name))
            .map(|r| ComponentId::Router(r.id()))
    }

    /// 硬件地址 `hw` 的持有者：先查节点接口，再查路由器端口
    pub fn lookup_by_hw(&self, hw: &HwAddr) -> Option<(ComponentId, &NetworkInterface)> {
        if let Some(n) = self.nodes.iter().find(|n| &n.iface().hw == hw) {
            return Some((ComponentId::Node(n.id()), n.iface()));
        }
        self.routers.iter().find_map(|r| {
            r.ports()
                .iter()
                .find(|p| &p.iface.hw == hw)
                .map(|p| (ComponentId::Router(r.id()), &p.iface))
        })
    }

    /// 完全匹配 `address`（地址和前缀都相等）的持有者
    pub fn lookup_by_address(&self, address: &Address) -> Option<(ComponentId, &NetworkInterface)> {
        if let Some(n) = self.nodes.iter().find(|n| &n.iface().address == address) {
            return Some((ComponentId::Node(n.id()), n.iface()));
        }
        self.routers.iter().find_map(|r| {
            r.ports()
                .iter()
                .find(|p| &p.iface.address == address)
                .map(|p| (ComponentId::Router(r.id()), &p.iface))
        })
    }

    /// 地址等于 `address` 的路由器端口，忽略前缀
    pub fn lookup_by_numeric(&self, address: &Address) -> Option<(RouterId, &Port)> {
        self.routers
            .iter()
            .find_map(|r| r.port_by_address(address).map(|p| (r.id(), p)))
    }

    /// 端口地址为节点 `n` 默认网关的路由器
    pub fn default_gateway(&self, n: NodeId) -> Option<RouterId> {
        let gateway = self.node(n).gateway();
        if gateway.is_unspecified() {
            return None;
        }
        self.lookup_by_numeric(gateway).map(|(r, _)| r)
    }

    /// 按名字取节点接口；路由器不能作为消息端点
    pub fn node_interface(&self, name: &str) -> Result<&NetworkInterface, UnknownEndpointError> {
        let n = self.node_by_name(name)?;
        Ok(self.node(n).iface())
    }

    /// 追加 trace 事件并更新对应计数
    pub(crate) fn record(&mut self, kind: TraceKind) {
        let stats = &mut self.stats;
        match &kind {
            TraceKind::ArpRequest { .. } => stats.arp_requests += 1,
            TraceKind::ArpReply { .. } => stats.arp_replies += 1,
            TraceKind::EchoRequest { .. } => stats.echo_requests += 1,
            TraceKind::EchoReply { .. } => stats.echo_replies += 1,
            TraceKind::TimeExceeded { .. } => stats.time_exceeded += 1,
            TraceKind::Delivered { .. } => stats.delivered_msgs += 1,
            TraceKind::ReplyReceived { .. } => stats.replies_received += 1,
            TraceKind::TimeExceededReceived { .. } => stats.time_exceeded_received += 1,
            TraceKind::Discarded { .. } => stats.discarded += 1,
        }
        let ev = self.trace.push(kind);
        debug!(seq = ev.seq, "{}", ev);
    }

    /// 清空之前的 trace 和计数，保留 ARP 缓存
    pub fn reset_trace(&mut self) {
        trace!(events = self.trace.len(), "清空 trace");
        self.trace.clear();
        self.stats = Stats::default();
    }
}
