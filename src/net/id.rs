//! 标识符
//!
//! 节点和路由器在拓扑中的句柄，以及链路层头部携带的硬件地址。

use std::fmt;

/// 节点在 `Topology` 中的下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// 路由器在 `Topology` 中的下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouterId(pub usize);

/// 两类组件之一，分发时穷尽匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Node(NodeId),
    Router(RouterId),
}

/// 不透明的硬件地址（类似 MAC）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HwAddr(String);

impl HwAddr {
    const BROADCAST: &'static str = "FF:FF:FF:FF:FF:FF";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 保留的“未知/所有人”地址，用作 ARP 请求的目标
    pub fn broadcast() -> Self {
        Self(Self::BROADCAST.to_string())
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == Self::BROADCAST
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HwAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
