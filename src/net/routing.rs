//! 静态路由表
//!
//! 表项按声明顺序保存，首次匹配：第一条目的网络包含该地址的表项胜出，不做最长前缀匹配。

use super::address::Address;

/// 一行 `#ROUTERTABLE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingEntry {
    pub destination: Address,
    /// [`Address::ON_LINK`] 表示目的地就在出口端口所在网段
    pub next_hop: Address,
    pub port: usize,
}

impl RoutingEntry {
    pub fn new(destination: Address, next_hop: Address, port: usize) -> Self {
        Self {
            destination,
            next_hop,
            port,
        }
    }

    pub fn is_on_link(&self) -> bool {
        self.next_hop.is_on_link()
    }

    pub fn covers(&self, address: &Address) -> bool {
        self.destination.is_same_network(address)
    }
}

#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    entries: Vec<RoutingEntry>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: RoutingEntry) {
        self.entries.push(entry);
    }

    /// 第一条覆盖 `address` 的表项
    pub fn lookup(&self, address: &Address) -> Option<&RoutingEntry> {
        self.entries.iter().find(|e| e.covers(address))
    }

    pub fn entries(&self) -> &[RoutingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
