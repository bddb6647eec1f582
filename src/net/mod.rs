//! 网络模拟模块
//!
//! 包含地址、数据包、ARP、节点、路由器，以及逐跳分发消息的网络拓扑。

// 子模块声明
mod address;
mod arp;
mod config;
mod dispatch;
mod iface;
mod id;
mod network;
mod node;
mod packet;
mod router;
mod routing;
mod stats;

// 重新导出公共接口
pub use address::Address;
pub use arp::{ArpCache, ArpResponder};
pub use config::{REPLY_SENTINEL_MTU, SimConfig};
pub use iface::{NetworkInterface, Port};
pub use id::{ComponentId, HwAddr, NodeId, RouterId};
pub use network::Topology;
pub use node::Node;
pub use packet::{Endpoint, Fragments, Packet, PacketKind, all_ttl_expired, fragment, reassemble};
pub use router::Router;
pub use routing::{RoutingEntry, RoutingTable};
pub use stats::Stats;
