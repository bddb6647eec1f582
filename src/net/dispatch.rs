//! 消息分发
//!
//! 让一条逻辑消息穿过整个拓扑。每一跳都是一次嵌套调用，所以 trace 事件的顺序
//! 就是经过各跳的顺序，递归深度不超过初始 TTL。

use tracing::{debug, info, warn};

use super::address::Address;
use super::config::REPLY_SENTINEL_MTU;
use super::id::{ComponentId, RouterId};
use super::iface::NetworkInterface;
use super::network::Topology;
use super::packet::{Fragments, PacketKind};
use crate::error::{DeliveryError, UnknownEndpointError};
use crate::trace::TraceKind;

impl Topology {
    /// 从 `src` 向 `dest` ping `message`，再让 echo reply（或 time exceeded 通知）
    /// 传回。两个地址都必须是节点接口，且连同前缀完全匹配。
    #[tracing::instrument(skip_all, fields(src = %src, dest = %dest))]
    pub fn send_message(
        &mut self,
        message: &str,
        src: &Address,
        dest: &Address,
    ) -> Result<(), DeliveryError> {
        let (source, _) = self
            .lookup_by_address(src)
            .ok_or_else(|| UnknownEndpointError::new(src))?;
        let (target, dest_iface) = self
            .lookup_by_address(dest)
            .map(|(id, iface)| (id, iface.clone()))
            .ok_or_else(|| UnknownEndpointError::new(dest))?;

        let n = match source {
            ComponentId::Node(n) => n,
            ComponentId::Router(_) => return Err(UnknownEndpointError::new(src).into()),
        };
        if let ComponentId::Router(_) = target {
            return Err(UnknownEndpointError::new(dest).into());
        }

        info!("📤 发送消息");
        self.node_send_message(n, message, target, &dest_iface)
    }

    /// 按节点名（不区分大小写）调用 [`Topology::send_message`]
    pub fn send_message_by_name(
        &mut self,
        message: &str,
        src: &str,
        dest: &str,
    ) -> Result<(), DeliveryError> {
        let src = self.node_interface(src)?.address;
        let dest = self.node_interface(dest)?.address;
        self.send_message(message, &src, &dest)
    }

    /// 把 echo request 交给目的硬件地址的持有者。
    ///
    /// 从路由器发出且全部过期的分片改为生成 time exceeded 通知；终点节点回复
    /// echo reply。
    #[tracing::instrument(skip_all, fields(src = ?src, egress = %dst_iface.address, frags = fragments.len()))]
    pub fn deliver_echo_request(
        &mut self,
        src: ComponentId,
        src_iface: &NetworkInterface,
        dst_iface: &NetworkInterface,
        fragments: Fragments,
    ) -> Result<(), DeliveryError> {
        if fragments.all_ttl_expired() {
            match src {
                ComponentId::Router(r) => return self.deliver_time_exceeded(r, fragments),
                ComponentId::Node(_) => {
                    self.discard(src, "echo request sent with ttl 0");
                    return Ok(());
                }
            }
        }

        debug!(from = %src_iface.hw, to = %dst_iface.hw, mtu = dst_iface.mtu, "📬 echo request 上链路");
        for pkt in &fragments {
            self.record(TraceKind::from_packet(pkt));
        }

        let dest = self.owner_of(&fragments)?;
        match dest {
            ComponentId::Node(n) => {
                if self.node_receive_echo_request(n, &fragments) {
                    self.deliver_echo_reply(dest, fragments)?;
                }
                Ok(())
            }
            ComponentId::Router(r) => self.router_receive_echo_request(r, fragments),
        }
    }

    /// 从 `src` 发出 echo reply。
    ///
    /// 节点根据 `fragments` 中的请求构造回复并按自身 MTU 切分；路由器直接转发
    /// `fragments`，它们已按出口链路切好。
    #[tracing::instrument(skip_all, fields(src = ?src, frags = fragments.len()))]
    pub fn deliver_echo_reply(
        &mut self,
        src: ComponentId,
        fragments: Fragments,
    ) -> Result<(), DeliveryError> {
        let reply = match src {
            ComponentId::Node(n) => {
                let node = self.node(n);
                node.reply_to_echo_request(&fragments, node.iface().mtu, self.config().initial_ttl)?
            }
            ComponentId::Router(_) => fragments.refragment(REPLY_SENTINEL_MTU)?,
        };

        if reply.all_ttl_expired() {
            match src {
                ComponentId::Router(r) => return self.deliver_time_exceeded(r, reply),
                ComponentId::Node(_) => {
                    self.discard(src, "echo reply sent with ttl 0");
                    return Ok(());
                }
            }
        }

        for pkt in &reply {
            self.record(TraceKind::from_packet(pkt));
        }

        let dest = self.owner_of(&reply)?;
        match dest {
            ComponentId::Node(n) => {
                self.node_receive_echo_reply(n, &reply);
                Ok(())
            }
            ComponentId::Router(r) => self.router_receive_echo_reply(r, reply),
        }
    }

    /// 从路由器 `src` 发出 time exceeded 通知。
    ///
    /// `fragments` 要么是过期的数据包（生成新通知），要么是正在转发的通知（原样
    /// 通过）。通知本身 TTL 耗尽时直接丢弃，不再上报。
    #[tracing::instrument(skip_all, fields(router = %self.router(src).name(), frags = fragments.len()))]
    pub fn deliver_time_exceeded(
        &mut self,
        src: RouterId,
        fragments: Fragments,
    ) -> Result<(), DeliveryError> {
        if fragments.kind() == PacketKind::TimeExceeded && fragments.all_ttl_expired() {
            self.discard(ComponentId::Router(src), "time exceeded notice expired");
            return Ok(());
        }

        let notice = self.reply_with_time_exceeded(src, fragments)?;
        for pkt in &notice {
            self.record(TraceKind::from_packet(pkt));
        }

        let dest = self.owner_of(&notice)?;
        match dest {
            ComponentId::Node(n) => {
                self.node_receive_time_exceeded(n, &notice);
                Ok(())
            }
            ComponentId::Router(r) => self.router_receive_time_exceeded(r, notice),
        }
    }

    /// 分片目的硬件地址所属的组件
    fn owner_of(&self, fragments: &Fragments) -> Result<ComponentId, UnknownEndpointError> {
        let hw = &fragments.head().dst.hw;
        self.lookup_by_hw(hw)
            .map(|(id, _)| id)
            .ok_or_else(|| UnknownEndpointError::new(hw))
    }

    fn discard(&mut self, at: ComponentId, reason: &str) {
        let at = self.name_of(at).to_string();
        warn!(at = %at, reason, "🗑️  丢弃数据包");
        self.record(TraceKind::Discarded {
            at,
            reason: reason.to_string(),
        });
    }
}
